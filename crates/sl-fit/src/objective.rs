//! The multi-observation likelihood objective.

use crate::curvature::CurvatureAccumulator;
use crate::statistic::EvaluatorTable;
use nalgebra::DMatrix;
use rayon::prelude::*;
use sl_core::{Error, ParamValues, Result};
use sl_obs::ObservationContainer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// The objective triple returned to the minimizer, plus the cumulative
/// predicted event count for diagnostics.
///
/// Rebuilt from scratch on every evaluation; the caller owns it until the
/// next evaluation replaces it.
#[derive(Debug, Clone)]
pub struct Objective {
    /// Objective (negative log-likelihood) value.
    pub value: f64,
    /// Gradient with respect to the free parameters, in set order.
    pub gradient: Vec<f64>,
    /// Symmetric curvature (Fisher-information) matrix.
    pub curvature: DMatrix<f64>,
    /// Total predicted event count across all observations.
    pub npred: f64,
}

/// Objective function over an observation container.
///
/// A single evaluation is a pure function of (observations, parameter
/// values): observations are evaluated independently, in parallel, into
/// worker-local partials, then merged in container order by a single
/// reducer, so results are reproducible bit-for-bit across calls.
pub struct ObservationsObjective {
    container: ObservationContainer,
    table: EvaluatorTable,
    n_params: usize,
    last_npred: AtomicU64,
}

impl ObservationsObjective {
    /// Create an objective with the standard evaluator table.
    pub fn new(container: ObservationContainer, n_params: usize) -> Self {
        Self::with_table(container, n_params, EvaluatorTable::standard())
    }

    /// Create an objective with an injected evaluator table.
    pub fn with_table(
        container: ObservationContainer,
        n_params: usize,
        table: EvaluatorTable,
    ) -> Self {
        Self { container, table, n_params, last_npred: AtomicU64::new(0) }
    }

    /// Number of free parameters.
    pub fn n_params(&self) -> usize {
        self.n_params
    }

    /// The observation container.
    pub fn container(&self) -> &ObservationContainer {
        &self.container
    }

    /// Cumulative predicted event count of the most recent evaluation.
    pub fn npred(&self) -> f64 {
        f64::from_bits(self.last_npred.load(Ordering::Relaxed))
    }

    /// Evaluate value, gradient and curvature at the given raw parameter
    /// values (in parameter-set order).
    pub fn evaluate(&self, raw: &[f64]) -> Result<Objective> {
        if raw.len() != self.n_params {
            return Err(Error::Validation(format!(
                "parameter length mismatch: expected {}, got {}",
                self.n_params,
                raw.len()
            )));
        }
        let started = Instant::now();
        let params = ParamValues::new(raw);

        // Worker-local partials, one per observation.
        let partials = self
            .container
            .as_slice()
            .par_iter()
            .map(|obs| {
                let evaluator = self.table.get(obs.statistic()).ok_or_else(|| {
                    Error::UnsupportedStatistic {
                        observation: obs.name().to_string(),
                        statistic: obs.statistic().to_string(),
                    }
                })?;
                evaluator.evaluate(obs, &params, self.n_params)
            })
            .collect::<Result<Vec<_>>>()?;

        // Single reducer: merge in container order so rounding is
        // independent of worker scheduling.
        let mut value = 0.0;
        let mut npred = 0.0;
        let mut gradient = vec![0.0; self.n_params];
        let mut curvature = CurvatureAccumulator::new(self.n_params);
        for part in partials {
            value += part.value;
            npred += part.npred;
            for (g, p) in gradient.iter_mut().zip(&part.gradient) {
                *g += p;
            }
            curvature.merge(part.curvature);
        }

        self.last_npred.store(npred.to_bits(), Ordering::Relaxed);
        log::debug!(
            "objective: {} observations, value = {value:.6}, npred = {npred:.3}, \
             curvature nnz = {}, elapsed = {:.3?}",
            self.container.len(),
            curvature.nnz(),
            started.elapsed()
        );

        Ok(Objective { value, gradient, curvature: curvature.to_dense(), npred })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sl_core::{EventLocation, Response, SkyDir, SparseRate};
    use sl_obs::{Bin, BinnedCube, EventData, Observation, Statistic};
    use std::sync::Arc;

    struct IdentityResponse;

    impl Response for IdentityResponse {
        fn rate(&self, _at: &EventLocation, params: &ParamValues<'_>) -> Result<SparseRate> {
            Ok(SparseRate::with_grad(params.get(0).unwrap(), vec![(0, 1.0)]))
        }

        fn integrated_rate(&self, params: &ParamValues<'_>) -> Result<SparseRate> {
            Ok(SparseRate::with_grad(params.get(0).unwrap(), vec![(0, 1.0)]))
        }
    }

    fn binned_obs(name: &str, counts: f64) -> Observation {
        let loc = EventLocation::new(SkyDir::new(0.0, 0.0), 1000.0, 0.0);
        Observation::new(
            name,
            Statistic::PoissonBinned,
            EventData::Binned(BinnedCube::from_bins(vec![Bin::new(loc, counts, 1.0, 1.0)])),
            1.0,
            1.0,
            Arc::new(IdentityResponse),
        )
        .unwrap()
    }

    #[test]
    fn test_objective_sums_observations() {
        let mut container = ObservationContainer::new();
        container.append(binned_obs("a", 3.0));
        container.append(binned_obs("b", 4.0));
        let objective = ObservationsObjective::new(container, 1);

        let result = objective.evaluate(&[2.0]).unwrap();
        let per_bin = |n: f64| 2.0 - n * 2.0f64.ln();
        assert_relative_eq!(result.value, per_bin(3.0) + per_bin(4.0), epsilon = 1e-12);
        assert_relative_eq!(result.npred, 4.0, epsilon = 1e-12);
        assert_relative_eq!(objective.npred(), 4.0, epsilon = 1e-12);
        assert_eq!(result.curvature.nrows(), 1);
    }

    #[test]
    fn test_missing_evaluator_is_fatal() {
        let mut container = ObservationContainer::new();
        container.append(binned_obs("orphan", 1.0));
        let objective =
            ObservationsObjective::with_table(container, 1, EvaluatorTable::new());

        let err = objective.evaluate(&[1.0]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedStatistic { .. }));
        assert!(err.to_string().contains("orphan"));
        assert!(err.to_string().contains("POISSON_BINNED"));
    }

    #[test]
    fn test_wrong_parameter_length_is_rejected() {
        let objective = ObservationsObjective::new(ObservationContainer::new(), 2);
        assert!(objective.evaluate(&[1.0]).is_err());
    }

    #[test]
    fn test_reevaluation_is_bitwise_identical() {
        let mut container = ObservationContainer::new();
        for i in 0..8 {
            container.append(binned_obs(&format!("run{i}"), i as f64));
        }
        let objective = ObservationsObjective::new(container, 1);

        let first = objective.evaluate(&[1.5]).unwrap();
        let second = objective.evaluate(&[1.5]).unwrap();
        assert_eq!(first.value.to_bits(), second.value.to_bits());
        assert_eq!(first.gradient, second.gradient);
        assert_eq!(first.curvature, second.curvature);
        assert_eq!(first.npred.to_bits(), second.npred.to_bits());
    }
}
