//! Event-level Poisson statistic.

use crate::npred::NpredEvaluator;
use crate::statistic::{ObservationPartial, StatisticEvaluator};
use sl_core::{Error, ParamValues, Result};
use sl_obs::{Observation, Statistic};

/// Unbinned Poisson likelihood.
///
/// Two passes: the Npred normalization term (the integral of the model
/// over the observation domain), then the per-event sum. The Npred term
/// contributes to value and gradient only; the response exposes no second
/// derivatives for it, so the curvature is the event-pass Fisher
/// approximation.
pub struct PoissonUnbinnedEvaluator;

impl StatisticEvaluator for PoissonUnbinnedEvaluator {
    fn statistic(&self) -> Statistic {
        Statistic::PoissonUnbinned
    }

    fn evaluate(
        &self,
        obs: &Observation,
        params: &ParamValues<'_>,
        n_params: usize,
    ) -> Result<ObservationPartial> {
        let events = obs.events()?;
        let mut part = ObservationPartial::with_estimate(n_params, events.len().min(1024));

        // Npred pass.
        let npred = NpredEvaluator.evaluate(obs, params)?;
        part.npred = npred.value;
        part.value += npred.value;
        for &(k, g) in &npred.grad {
            part.gradient[k] += g;
        }

        // Event pass.
        let mut active_idx: Vec<usize> = Vec::new();
        let mut active_grad: Vec<f64> = Vec::new();
        for (ievent, location) in events.iter().enumerate() {
            let rate = obs.response().rate(location, params)?;
            if rate.value <= 0.0 {
                // An observed event with no predicted density means the
                // model/response combination is broken for this dataset.
                return Err(Error::ZeroModelAtEvent {
                    observation: obs.name().to_string(),
                    event: ievent,
                    rate: rate.value,
                });
            }

            part.value -= rate.value.ln();
            let inv = 1.0 / rate.value;

            if rate.grad.is_empty() {
                continue;
            }
            active_idx.clear();
            active_grad.clear();
            for &(k, g) in &rate.grad {
                part.gradient[k] -= g * inv;
                active_idx.push(k);
                active_grad.push(g);
            }
            part.curvature.add_outer(&active_idx, &active_grad, inv * inv);
        }

        Ok(part)
    }
}
