//! Maximum-likelihood fit driver.
//!
//! Wires the observation objective to the L-BFGS minimizer, then derives
//! parameter uncertainties from the curvature matrix at the minimum and
//! writes best-fit values and gradients back into the parameter store.

use crate::objective::ObservationsObjective;
use crate::optimizer::{LbfgsOptimizer, OptimizerConfig};
use nalgebra::DMatrix;
use sl_core::{FitResult, Result};
use sl_models::{ParameterSet, ParameterStore};

/// Maximum-likelihood estimator over an observation container.
#[derive(Clone, Default)]
pub struct MaximumLikelihoodFit {
    config: OptimizerConfig,
}

impl MaximumLikelihoodFit {
    /// Create a fit driver with default optimizer configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fit driver with a custom optimizer configuration.
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Fit the free parameters of `pset`, starting from their current
    /// store values.
    ///
    /// On success the best-fit values and final gradients are written back
    /// into the store (the objective itself never mutates parameters).
    pub fn fit(
        &self,
        objective: &ObservationsObjective,
        pset: &ParameterSet,
        store: &mut ParameterStore,
    ) -> Result<FitResult> {
        let init = pset.raw_values(store)?;
        let optimizer = LbfgsOptimizer::new(self.config.clone());
        let minimum = optimizer.minimize(objective, &init, pset.bounds())?;

        // One more evaluation at the minimum for the final triple.
        let at_min = objective.evaluate(&minimum.parameters)?;
        let n = pset.len();

        let fit = match invert_curvature(&at_min.curvature) {
            Some(covariance) => {
                let mut uncertainties = Vec::with_capacity(n);
                let mut all_ok = true;
                for i in 0..n {
                    let var = covariance[(i, i)];
                    if var.is_finite() && var > 0.0 {
                        uncertainties.push(var.sqrt());
                    } else {
                        all_ok = false;
                        uncertainties.push(diagonal_uncertainty(&at_min.curvature, i));
                    }
                }
                if all_ok {
                    let cov_flat: Vec<f64> = covariance.iter().copied().collect();
                    FitResult::with_covariance(
                        minimum.parameters,
                        uncertainties,
                        cov_flat,
                        minimum.fval,
                        at_min.npred,
                        minimum.converged,
                        minimum.n_fev,
                    )
                } else {
                    log::warn!("invalid covariance diagonal; omitting covariance matrix");
                    FitResult::new(
                        minimum.parameters,
                        uncertainties,
                        minimum.fval,
                        at_min.npred,
                        minimum.converged,
                        minimum.n_fev,
                    )
                }
            }
            None => {
                log::warn!("curvature inversion failed, using diagonal approximation");
                let uncertainties =
                    (0..n).map(|i| diagonal_uncertainty(&at_min.curvature, i)).collect();
                FitResult::new(
                    minimum.parameters,
                    uncertainties,
                    minimum.fval,
                    at_min.npred,
                    minimum.converged,
                    minimum.n_fev,
                )
            }
        };

        pset.store_values(store, &fit.parameters)?;
        pset.store_gradients(store, &at_min.gradient)?;
        Ok(fit)
    }
}

/// Invert the curvature matrix; `None` if it is singular.
fn invert_curvature(curvature: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if curvature.nrows() == 0 {
        return None;
    }
    curvature.clone().try_inverse()
}

/// Uncorrelated uncertainty estimate `1/sqrt(H_ii)` for one parameter.
fn diagonal_uncertainty(curvature: &DMatrix<f64>, i: usize) -> f64 {
    let h = curvature[(i, i)];
    if h > 0.0 {
        1.0 / h.sqrt()
    } else {
        f64::NAN
    }
}
