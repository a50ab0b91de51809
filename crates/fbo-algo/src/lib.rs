//! # fbo-algo: feedback-optimization update rules
//!
//! Optimizers that steer the input of a measured steady-state map
//! `y = h(u)` toward the minimizer of `phi(u, y) = phi_u(u) + phi_y(y)`
//! under input and output polytope constraints, using only repeated output
//! measurements and the map's sensitivity.
//!
//! Five variants are provided, dispatched through the closed [`Optimizer`]
//! enum:
//!
//! | Variant | Dualizes | Update style |
//! |---------|----------|--------------|
//! | [`PrimalOptimizer`] | nothing | projected gradient on `u` against linearized output constraints |
//! | [`DualHOptimizer`] | the map `y = h(u)` | gradient ascent on `nu_h`, gradient descent on `z` and `u` |
//! | [`DualHProximalOptimizer`] | the map `y = h(u)` | per-step QPs with proximal regularization |
//! | [`DualYOptimizer`] | the output constraint | clipped dual ascent on `lamb_y`, gradient descent on `u` |
//! | [`DualYProximalOptimizer`] | the output constraint | clipped dual ascent plus a proximal QP for `u` |
//!
//! Each variant exposes `data_initial` (the timestep-0 record) and
//! `data_step` (one fixed-point transition). Steps never mutate the input
//! record; they produce a fresh [`IterationRecord`].

pub mod config;
pub mod cost;
pub mod dual_h;
pub mod dual_h_proximal;
pub mod dual_y;
pub mod dual_y_proximal;
pub mod optimizer;
pub mod primal;
pub mod record;

use thiserror::Error;

pub use config::OptimizerConfig;
pub use cost::Cost;
pub use dual_h::DualHOptimizer;
pub use dual_h_proximal::DualHProximalOptimizer;
pub use dual_y::DualYOptimizer;
pub use dual_y_proximal::DualYProximalOptimizer;
pub use optimizer::{Optimizer, ProjectionStatus, StepOutcome};
pub use primal::PrimalOptimizer;
pub use record::IterationRecord;

use fbo_core::CoreError;

/// Errors raised by optimizer construction and stepping.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Invalid configuration or dimensions, caught at construction.
    #[error("optimizer validation: {0}")]
    DataValidation(String),

    /// A QP that the variant cannot recover from returned no solution.
    #[error("no QP solution found for {context}")]
    QpUnsolved { context: String },

    /// Failure in the core solver substrate.
    #[error(transparent)]
    Core(#[from] CoreError),
}
