//! # fbo-sim: closed-loop simulation of feedback optimizers
//!
//! Drives one optimizer against a [`fbo_core::System`] for a fixed number
//! of timesteps, optionally corrupting the measurement the optimizer sees
//! with seeded Gaussian noise, and freezes the trajectory into a tabular
//! artifact (a polars `DataFrame`, exportable to CSV).
//!
//! The measurement loop mirrors a real deployment: the optimizer only ever
//! acts on the measured output, and after every input update the plant is
//! re-measured before the next step.

pub mod simulation;
pub mod table;

use polars::error::PolarsError;
use thiserror::Error;

pub use simulation::{RunSummary, Simulation, SimulationConfig, SimulationRun};

use fbo_algo::OptimizerError;

/// Errors raised by simulation setup, stepping, and export.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Invalid simulation configuration, caught at construction.
    #[error("simulation validation: {0}")]
    DataValidation(String),

    /// An optimizer step failed unrecoverably.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Trajectory table assembly failed.
    #[error("table assembly: {0}")]
    Table(#[from] PolarsError),

    /// Artifact file I/O failed.
    #[error("artifact io: {0}")]
    Io(#[from] std::io::Error),
}
