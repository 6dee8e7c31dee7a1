//! Binned statistic evaluators.

use crate::statistic::{ObservationPartial, StatisticEvaluator};
use sl_core::{Error, ParamValues, Result};
use sl_obs::{Bin, Observation, Statistic};

/// Rough per-bin nonzero estimate used to reserve curvature capacity.
const NNZ_PER_ACTIVE_PAIR: usize = 4;

/// Predicted counts in a bin: response intensity scaled by bin volume and
/// livetime. The same volume factor applies to the partials.
fn bin_model(bin: &Bin, livetime: f64, rate: f64) -> (f64, f64) {
    let volume = bin.solid_angle * bin.energy_width * livetime;
    (rate * volume, volume)
}

/// Per-bin Poisson likelihood.
///
/// Value contribution per bin is `m - n ln(m)`; constants involving only
/// the observed counts are dropped (see
/// [`poisson_constant`](crate::statistic::poisson_constant)).
pub struct PoissonBinnedEvaluator;

impl StatisticEvaluator for PoissonBinnedEvaluator {
    fn statistic(&self) -> Statistic {
        Statistic::PoissonBinned
    }

    fn evaluate(
        &self,
        obs: &Observation,
        params: &ParamValues<'_>,
        n_params: usize,
    ) -> Result<ObservationPartial> {
        let cube = obs.binned()?;
        let mut part =
            ObservationPartial::with_estimate(n_params, cube.len().min(n_params * NNZ_PER_ACTIVE_PAIR));
        let mut active_idx: Vec<usize> = Vec::new();
        let mut active_grad: Vec<f64> = Vec::new();

        for bin in cube.iter() {
            let rate = obs.response().rate(&bin.location, params)?;
            let (model, volume) = bin_model(bin, obs.livetime(), rate.value);

            // Empty-model bins contribute nothing.
            if model <= 0.0 {
                continue;
            }

            part.npred += model;
            part.value += model - bin.counts * model.ln();

            if rate.grad.is_empty() {
                continue;
            }
            active_idx.clear();
            active_grad.clear();
            for &(k, g) in &rate.grad {
                active_idx.push(k);
                active_grad.push(g * volume);
            }

            if bin.counts > 0.0 {
                let fb = bin.counts / model;
                let fc = 1.0 - fb;
                let fa = fb / model;
                for (&k, &g) in active_idx.iter().zip(&active_grad) {
                    part.gradient[k] += fc * g;
                }
                part.curvature.add_outer(&active_idx, &active_grad, fa);
            } else {
                // n = 0 is the fb -> 0 limit of the branch above; the
                // curvature term vanishes there and is skipped, which is
                // where the bulk of a sparse sky map's bins land.
                for (&k, &g) in active_idx.iter().zip(&active_grad) {
                    part.gradient[k] += g;
                }
            }
        }

        Ok(part)
    }
}

/// Per-bin Gaussian (chi-square) likelihood.
///
/// Every bin carries its own measurement standard deviation; a
/// non-positive sigma is a data defect, not something to clamp over.
pub struct GaussianBinnedEvaluator;

impl StatisticEvaluator for GaussianBinnedEvaluator {
    fn statistic(&self) -> Statistic {
        Statistic::GaussianBinned
    }

    fn evaluate(
        &self,
        obs: &Observation,
        params: &ParamValues<'_>,
        n_params: usize,
    ) -> Result<ObservationPartial> {
        let cube = obs.binned()?;
        let mut part =
            ObservationPartial::with_estimate(n_params, cube.len().min(n_params * NNZ_PER_ACTIVE_PAIR));
        let mut active_idx: Vec<usize> = Vec::new();
        let mut active_grad: Vec<f64> = Vec::new();

        for (ibin, bin) in cube.iter().enumerate() {
            if bin.sigma <= 0.0 {
                return Err(Error::InvalidVariance {
                    observation: obs.name().to_string(),
                    bin: ibin,
                    sigma: bin.sigma,
                });
            }

            let rate = obs.response().rate(&bin.location, params)?;
            let (model, volume) = bin_model(bin, obs.livetime(), rate.value);
            part.npred += model;

            let weight = 1.0 / (bin.sigma * bin.sigma);
            let residual = bin.counts - model;
            part.value += 0.5 * residual * residual * weight;

            if rate.grad.is_empty() {
                continue;
            }
            active_idx.clear();
            active_grad.clear();
            for &(k, g) in &rate.grad {
                let g = g * volume;
                part.gradient[k] -= residual * weight * g;
                active_idx.push(k);
                active_grad.push(g);
            }
            // No empty-bin shortcut here: the weight is essentially never
            // zero, so the curvature update always runs.
            part.curvature.add_outer(&active_idx, &active_grad, weight);
        }

        Ok(part)
    }
}
