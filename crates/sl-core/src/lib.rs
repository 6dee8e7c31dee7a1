//! # sl-core
//!
//! Core types, traits and errors for SkyLike.
//!
//! This crate is the leaf dependency of the workspace: it defines the error
//! taxonomy, the shared data types (sky locations, sparse rates, fit
//! results) and the collaborator traits through which the likelihood core
//! consumes instrument responses.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{ParamValues, Response};
pub use types::{EventLocation, FitResult, SkyDir, SparseRate};
