//! Closed dispatch over the optimizer variants.

use faer::Mat;

use fbo_core::System;

use crate::cost::Cost;
use crate::record::IterationRecord;
use crate::{
    DualHOptimizer, DualHProximalOptimizer, DualYOptimizer, DualYProximalOptimizer,
    OptimizerError, PrimalOptimizer,
};

/// Which branch a step's input projection took.
///
/// Only the primal variant ever reports [`ProjectionStatus::LinearizationDropped`].
/// The third state of the tri-state, a QP failure with no fallback, is a
/// fatal `Err` from `data_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionStatus {
    /// The intended projection succeeded.
    Solved,
    /// The linearized output constraint made the projection infeasible;
    /// the step fell back to projecting onto the input set alone.
    LinearizationDropped,
}

/// Result of one optimizer transition.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The new record for timestep `k + 1`.
    pub record: IterationRecord,
    /// Which projection branch produced the new input.
    pub projection: ProjectionStatus,
}

impl StepOutcome {
    pub(crate) fn solved(record: IterationRecord) -> Self {
        Self {
            record,
            projection: ProjectionStatus::Solved,
        }
    }
}

/// The closed set of optimizer kinds, dispatched through a single
/// step operation.
#[derive(Debug)]
pub enum Optimizer {
    Primal(PrimalOptimizer),
    DualH(DualHOptimizer),
    DualHProximal(DualHProximalOptimizer),
    DualY(DualYOptimizer),
    DualYProximal(DualYProximalOptimizer),
}

impl Optimizer {
    /// Display label.
    pub fn name(&self) -> &str {
        match self {
            Optimizer::Primal(o) => o.name(),
            Optimizer::DualH(o) => o.name(),
            Optimizer::DualHProximal(o) => o.name(),
            Optimizer::DualY(o) => o.name(),
            Optimizer::DualYProximal(o) => o.name(),
        }
    }

    /// Cost coefficients this optimizer descends.
    pub fn cost(&self) -> &Cost {
        match self {
            Optimizer::Primal(o) => o.cost(),
            Optimizer::DualH(o) => o.cost(),
            Optimizer::DualHProximal(o) => o.cost(),
            Optimizer::DualY(o) => o.cost(),
            Optimizer::DualYProximal(o) => o.cost(),
        }
    }

    /// Build the timestep-0 record.
    pub fn data_initial(
        &self,
        system: &dyn System,
        u_0: Option<&Mat<f64>>,
    ) -> Result<IterationRecord, OptimizerError> {
        match self {
            Optimizer::Primal(o) => o.data_initial(system, u_0),
            Optimizer::DualH(o) => o.data_initial(system, u_0),
            Optimizer::DualHProximal(o) => o.data_initial(system, u_0),
            Optimizer::DualY(o) => o.data_initial(system, u_0),
            Optimizer::DualYProximal(o) => o.data_initial(system, u_0),
        }
    }

    /// Perform a single update step, deriving the record for `k + 1`.
    pub fn data_step(
        &self,
        system: &dyn System,
        record: &IterationRecord,
    ) -> Result<StepOutcome, OptimizerError> {
        match self {
            Optimizer::Primal(o) => o.data_step(system, record),
            Optimizer::DualH(o) => o.data_step(system, record),
            Optimizer::DualHProximal(o) => o.data_step(system, record),
            Optimizer::DualY(o) => o.data_step(system, record),
            Optimizer::DualYProximal(o) => o.data_step(system, record),
        }
    }
}

impl From<PrimalOptimizer> for Optimizer {
    fn from(o: PrimalOptimizer) -> Self {
        Optimizer::Primal(o)
    }
}

impl From<DualHOptimizer> for Optimizer {
    fn from(o: DualHOptimizer) -> Self {
        Optimizer::DualH(o)
    }
}

impl From<DualHProximalOptimizer> for Optimizer {
    fn from(o: DualHProximalOptimizer) -> Self {
        Optimizer::DualHProximal(o)
    }
}

impl From<DualYOptimizer> for Optimizer {
    fn from(o: DualYOptimizer) -> Self {
        Optimizer::DualY(o)
    }
}

impl From<DualYProximalOptimizer> for Optimizer {
    fn from(o: DualYProximalOptimizer) -> Self {
        Optimizer::DualYProximal(o)
    }
}
