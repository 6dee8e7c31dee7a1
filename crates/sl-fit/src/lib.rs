//! # sl-fit
//!
//! Likelihood objective, curvature accumulation and fit driver for SkyLike.
//!
//! This crate provides:
//! - [`CurvatureAccumulator`]: sparse symmetric accumulation of
//!   outer-product curvature contributions.
//! - The three statistic evaluators (Poisson binned, Gaussian binned,
//!   Poisson unbinned) behind the [`StatisticEvaluator`] trait and the
//!   injected [`EvaluatorTable`].
//! - [`NpredEvaluator`]: the total-predicted-count term of the unbinned
//!   statistic.
//! - [`ObservationsObjective`]: the multi-observation objective returning
//!   the value/gradient/curvature triple to a minimizer.
//! - [`LbfgsOptimizer`] and [`MaximumLikelihoodFit`]: the thin adapter
//!   from the objective to an L-BFGS minimizer with covariance extraction.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binned;
pub mod curvature;
pub mod mle;
pub mod npred;
pub mod objective;
pub mod optimizer;
pub mod statistic;
pub mod unbinned;

pub use binned::{GaussianBinnedEvaluator, PoissonBinnedEvaluator};
pub use curvature::CurvatureAccumulator;
pub use mle::MaximumLikelihoodFit;
pub use npred::NpredEvaluator;
pub use objective::{Objective, ObservationsObjective};
pub use optimizer::{LbfgsOptimizer, MinimizeResult, ObjectiveFunction, OptimizerConfig};
pub use statistic::{poisson_constant, EvaluatorTable, ObservationPartial, StatisticEvaluator};
pub use unbinned::PoissonUnbinnedEvaluator;
