//! Total predicted event count (Npred).

use sl_core::{Error, ParamValues, Result, SparseRate};
use sl_obs::Observation;

/// Computes the total predicted event count over an observation's full
/// domain, with its sparse parameter gradient.
///
/// The integral itself is the response's job (numerical quadrature over
/// energy/time/direction lives behind [`sl_core::Response`]); this
/// evaluator assembles the gradient and enforces physicality of the
/// prediction.
pub struct NpredEvaluator;

impl NpredEvaluator {
    /// Evaluate `(N, dN/dp)` for one observation.
    pub fn evaluate(&self, obs: &Observation, params: &ParamValues<'_>) -> Result<SparseRate> {
        let npred = obs.response().integrated_rate(params)?;
        if npred.value < 0.0 {
            return Err(Error::NegativePrediction {
                observation: obs.name().to_string(),
                npred: npred.value,
            });
        }
        Ok(npred)
    }
}
