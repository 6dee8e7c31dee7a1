//! Common data types for SkyLike

use serde::{Deserialize, Serialize};

/// A sky direction in celestial coordinates (degrees).
///
/// Projections and pixelization schemes live outside the likelihood core;
/// this type only carries the direction through to the response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyDir {
    /// Right ascension in degrees.
    pub ra: f64,
    /// Declination in degrees.
    pub dec: f64,
}

impl SkyDir {
    /// Create a sky direction from right ascension and declination.
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }
}

/// A point in the observation domain: direction, energy and time.
///
/// Used both for individual events and for bin centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventLocation {
    /// Sky direction.
    pub dir: SkyDir,
    /// Energy in MeV.
    pub energy: f64,
    /// Time in seconds since the observation start.
    pub time: f64,
}

impl EventLocation {
    /// Create an event location.
    pub fn new(dir: SkyDir, energy: f64, time: f64) -> Self {
        Self { dir, energy, time }
    }
}

/// A predicted rate together with its sparse parameter gradient.
///
/// The gradient holds `(parameter index, partial derivative)` pairs for
/// the typically small subset of free parameters the rate depends on.
#[derive(Debug, Clone, Default)]
pub struct SparseRate {
    /// Predicted rate.
    pub value: f64,
    /// Nonzero partial derivatives, indexed in parameter-set order.
    pub grad: Vec<(usize, f64)>,
}

impl SparseRate {
    /// A rate with no parameter dependence.
    pub fn new(value: f64) -> Self {
        Self { value, grad: Vec::new() }
    }

    /// A rate with the given sparse gradient.
    pub fn with_grad(value: f64, grad: Vec<(usize, f64)>) -> Self {
        Self { value, grad }
    }
}

/// Fit result containing parameter estimates and uncertainties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    /// Best-fit parameter values (raw, minimizer space)
    pub parameters: Vec<f64>,

    /// Parameter uncertainties (sqrt of covariance diagonal)
    pub uncertainties: Vec<f64>,

    /// Covariance matrix (row-major, N×N). `None` if curvature inversion failed.
    pub covariance: Option<Vec<f64>>,

    /// Objective value (negative log-likelihood) at minimum
    pub nll: f64,

    /// Total predicted event count across all observations at minimum
    pub npred: f64,

    /// Convergence status
    pub converged: bool,

    /// Number of function evaluations
    pub n_evaluations: usize,
}

impl FitResult {
    /// Create a new fit result
    pub fn new(
        parameters: Vec<f64>,
        uncertainties: Vec<f64>,
        nll: f64,
        npred: f64,
        converged: bool,
        n_evaluations: usize,
    ) -> Self {
        Self {
            parameters,
            uncertainties,
            covariance: None,
            nll,
            npred,
            converged,
            n_evaluations,
        }
    }

    /// Create a fit result with covariance matrix
    pub fn with_covariance(
        parameters: Vec<f64>,
        uncertainties: Vec<f64>,
        covariance: Vec<f64>,
        nll: f64,
        npred: f64,
        converged: bool,
        n_evaluations: usize,
    ) -> Self {
        Self {
            parameters,
            uncertainties,
            covariance: Some(covariance),
            nll,
            npred,
            converged,
            n_evaluations,
        }
    }

    /// Get correlation matrix element (i, j). Returns `None` if covariance is unavailable.
    pub fn correlation(&self, i: usize, j: usize) -> Option<f64> {
        let cov = self.covariance.as_ref()?;
        let n = self.parameters.len();
        if i >= n || j >= n {
            return None;
        }
        let sigma_i = self.uncertainties[i];
        let sigma_j = self.uncertainties[j];
        if sigma_i <= 0.0 || sigma_j <= 0.0 {
            return None;
        }
        Some(cov[i * n + j] / (sigma_i * sigma_j))
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the result as JSON to `path`.
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
