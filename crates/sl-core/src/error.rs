//! Error types for SkyLike

use thiserror::Error;

/// SkyLike error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// A free parameter appears in more than one model without being
    /// declared shared, making gradient attribution ambiguous.
    #[error("Inconsistent model: {0}")]
    InconsistentModel(String),

    /// A Gaussian-statistic bin carries a non-positive standard deviation.
    #[error("Invalid variance in observation '{observation}', bin {bin}: sigma = {sigma}")]
    InvalidVariance {
        /// Observation name.
        observation: String,
        /// Index of the offending bin.
        bin: usize,
        /// The non-positive standard deviation.
        sigma: f64,
    },

    /// The integrated model prediction is negative (unphysical flux).
    #[error("Negative predicted count in observation '{observation}': npred = {npred}")]
    NegativePrediction {
        /// Observation name.
        observation: String,
        /// The negative predicted count.
        npred: f64,
    },

    /// An observed event has a non-positive predicted rate, signalling a
    /// model/response mismatch.
    #[error("Zero model at event {event} of observation '{observation}': rate = {rate}")]
    ZeroModelAtEvent {
        /// Observation name.
        observation: String,
        /// Index of the offending event.
        event: usize,
        /// The non-positive predicted rate.
        rate: f64,
    },

    /// No evaluator is registered for an observation's statistic kind.
    #[error("Unsupported statistic '{statistic}' for observation '{observation}'")]
    UnsupportedStatistic {
        /// Observation name.
        observation: String,
        /// The unhandled statistic kind.
        statistic: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
