//! # sl-models
//!
//! Source models and parameter handling for SkyLike.
//!
//! This crate provides:
//! - A [`ParameterStore`] owning all model parameters, referenced by stable
//!   [`ParamKey`]s (no shared parameter state).
//! - The [`ParameterSet`]: the ordered, deduplicated view over all free
//!   parameters that defines the objective's index space.
//! - Spectral components with analytic gradients ([`PowerLaw`],
//!   [`PowerLawIntegral`]) and the [`SourceModels`] composition.
//! - [`SourceResponse`], the model-side reference implementation of
//!   [`sl_core::Response`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod parameter;
pub mod source;
pub mod spectral;

pub use parameter::{ParamKey, Parameter, ParameterSet, ParameterStore};
pub use source::{SourceModel, SourceModels, SourceResponse};
pub use spectral::{PowerLaw, PowerLawIntegral, SpectralModel};
