//! Core traits for SkyLike
//!
//! This module defines the collaborator seams of the likelihood core:
//! the instrument response capability and the parameter-value view it
//! consumes. The objective never depends on a concrete response
//! implementation, only on [`Response`].

use crate::types::{EventLocation, SparseRate};
use crate::Result;

/// View over the current free-parameter values, in parameter-set order.
///
/// The values are the raw (minimizer-space) values; implementations that
/// need physical values apply the parameter scale factors themselves and
/// must return gradients with respect to the raw values (chain rule
/// included). The view is immutable: a single objective evaluation is a
/// pure function of these values.
#[derive(Debug, Clone, Copy)]
pub struct ParamValues<'a> {
    values: &'a [f64],
}

impl<'a> ParamValues<'a> {
    /// Wrap a raw parameter vector.
    pub fn new(values: &'a [f64]) -> Self {
        Self { values }
    }

    /// Number of free parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the parameter vector is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at parameter index `i`.
    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied()
    }

    /// The underlying slice.
    pub fn as_slice(&self) -> &'a [f64] {
        self.values
    }
}

/// Instrument response capability - abstraction over the convolution of a
/// source model with effective area, energy dispersion and point spread.
///
/// The likelihood core consumes responses as black boxes: per bin/event it
/// asks for the predicted rate and its sparse parameter gradient, and per
/// observation for the rate integrated over the full domain (the Npred
/// normalization term of the unbinned Poisson statistic).
pub trait Response: Send + Sync {
    /// Predicted rate at a direction/energy/time location, with the sparse
    /// gradient over the free parameters the rate depends on.
    ///
    /// For binned observations the returned value is an intensity that the
    /// evaluator scales by bin volume and livetime; for unbinned
    /// observations it is the event rate density used directly.
    fn rate(&self, at: &EventLocation, params: &ParamValues<'_>) -> Result<SparseRate>;

    /// Rate integrated over the observation's full direction/energy/time
    /// domain, with its sparse parameter gradient.
    ///
    /// Only first derivatives are exposed; the curvature of the integrated
    /// term is not available to the core.
    fn integrated_rate(&self, params: &ParamValues<'_>) -> Result<SparseRate>;
}
