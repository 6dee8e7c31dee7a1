//! Statistic evaluator dispatch.
//!
//! Each observation is evaluated by the [`StatisticEvaluator`] registered
//! for its statistic kind. The table is an explicit, injected mapping
//! constructed once at setup. Adding a statistic kind is a deliberate
//! extension, not an open plugin point, and nothing is registered at
//! process scope.

use crate::curvature::CurvatureAccumulator;
use sl_core::{ParamValues, Result};
use sl_obs::{Observation, Statistic};
use statrs::function::gamma::ln_gamma;
use std::collections::HashMap;
use std::sync::Arc;

/// One observation's contribution to the objective: scalar value, total
/// predicted count, dense gradient and a local curvature accumulator.
///
/// Partials are produced independently per observation (worker-local
/// during parallel evaluation) and merged by the objective's reducer.
#[derive(Debug, Clone)]
pub struct ObservationPartial {
    /// Statistic value contribution.
    pub value: f64,
    /// Predicted event count contribution.
    pub npred: f64,
    /// Dense gradient contribution, length = number of free parameters.
    pub gradient: Vec<f64>,
    /// Local curvature contribution.
    pub curvature: CurvatureAccumulator,
}

impl ObservationPartial {
    /// Zero partial for `n` free parameters.
    pub fn new(n: usize) -> Self {
        Self {
            value: 0.0,
            npred: 0.0,
            gradient: vec![0.0; n],
            curvature: CurvatureAccumulator::new(n),
        }
    }

    /// Zero partial with curvature capacity reserved for an estimated
    /// number of nonzero entries.
    pub fn with_estimate(n: usize, nnz_estimate: usize) -> Self {
        Self {
            value: 0.0,
            npred: 0.0,
            gradient: vec![0.0; n],
            curvature: CurvatureAccumulator::with_estimate(n, nnz_estimate),
        }
    }
}

/// A likelihood statistic: turns one observation into an
/// [`ObservationPartial`] given the current parameter values.
pub trait StatisticEvaluator: Send + Sync {
    /// The statistic kind this evaluator implements.
    fn statistic(&self) -> Statistic;

    /// Evaluate one observation's contribution. `n_params` is the
    /// dimension of the gradient vector and curvature matrix.
    fn evaluate(
        &self,
        obs: &Observation,
        params: &ParamValues<'_>,
        n_params: usize,
    ) -> Result<ObservationPartial>;
}

/// Injected mapping from statistic kind to evaluator.
#[derive(Clone, Default)]
pub struct EvaluatorTable {
    evaluators: HashMap<Statistic, Arc<dyn StatisticEvaluator>>,
}

impl EvaluatorTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard table with all three statistics registered.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register(Arc::new(crate::binned::PoissonBinnedEvaluator));
        table.register(Arc::new(crate::binned::GaussianBinnedEvaluator));
        table.register(Arc::new(crate::unbinned::PoissonUnbinnedEvaluator));
        table
    }

    /// Register an evaluator under its statistic kind, replacing any
    /// previous registration.
    pub fn register(&mut self, evaluator: Arc<dyn StatisticEvaluator>) {
        self.evaluators.insert(evaluator.statistic(), evaluator);
    }

    /// Look up the evaluator for a statistic kind.
    pub fn get(&self, statistic: Statistic) -> Option<&Arc<dyn StatisticEvaluator>> {
        self.evaluators.get(&statistic)
    }
}

/// The `sum ln(n_i!)` constant dropped from the Poisson statistic value.
///
/// The objective omits observation-only constants since they do not affect
/// gradients or curvature; adding this term back turns the Poisson-binned
/// value into the full negative log-likelihood for goodness-of-fit
/// reporting. Unbinned and Gaussian observations contribute nothing.
pub fn poisson_constant(obs: &Observation) -> f64 {
    match obs.statistic() {
        Statistic::PoissonBinned => match obs.binned() {
            Ok(cube) => cube.iter().map(|bin| ln_gamma(bin.counts + 1.0)).sum(),
            Err(_) => 0.0,
        },
        _ => 0.0,
    }
}
