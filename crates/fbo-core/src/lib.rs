//! # fbo-core: geometry and solver substrate for feedback optimization
//!
//! This crate provides the pieces every feedback-optimization controller in
//! the workspace leans on:
//!
//! - [`Polytope`]: a convex feasible region in H-representation `A x <= b`,
//!   with constraint evaluation, intersection by row stacking, and cached
//!   Euclidean projection.
//! - [`Argmin`]: a compiled convex-QP solver bound to one polytope. The
//!   constraint block is compiled to sparse form once; each call only swaps
//!   the objective coefficients. Backed by
//!   [Clarabel](https://github.com/oxfordcontrol/Clarabel.rs).
//! - [`System`]: the steady-state oracle contract `y = h(u)` together with
//!   its sensitivity `∇h(u)` and the static input/output constraint sets.
//!
//! ## Conventions
//!
//! All vectors are `(n, 1)` column matrices (`faer::Mat<f64>`). Dimension
//! mismatches are programming errors and panic; recoverable failures
//! (infeasible projections, solver setup issues) are reported through
//! [`CoreError`] or the `Ok(None)` sentinel of [`Argmin::solve`].

pub mod linalg;
pub mod polytope;
pub mod qp;
pub mod system;

use thiserror::Error;

pub use polytope::Polytope;
pub use qp::Argmin;
pub use system::{NonlinearSystem, System};

/// Errors raised by the core substrate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Input data failed a construction-time validation check.
    #[error("data validation: {0}")]
    DataValidation(String),

    /// The QP backend could not be set up for this problem.
    #[error("solver setup: {0}")]
    SolverSetup(String),
}
