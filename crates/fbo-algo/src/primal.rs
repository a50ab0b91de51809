//! Projected primal gradient descent.

use faer::Mat;
use tracing::warn;

use fbo_core::{Polytope, System};

use crate::config::OptimizerConfig;
use crate::cost::Cost;
use crate::optimizer::{ProjectionStatus, StepOutcome};
use crate::record::{self, IterationRecord};
use crate::OptimizerError;

/// Substitutes the measured map for every occurrence of `y` and takes a
/// single projected gradient step per timestep:
///
/// ```text
/// min   phi_u(u) + phi_y(h(u))
/// s.t.  u in U,  h(u) in Y
/// ```
///
/// The output constraint is enforced through its linearization around the
/// previous `(u, y)`; when that linearized intersection turns out empty,
/// the step degrades to projecting onto `U` alone and reports
/// [`ProjectionStatus::LinearizationDropped`].
#[derive(Debug)]
pub struct PrimalOptimizer {
    name: String,
    cost: Cost,
    alpha: f64,
}

impl PrimalOptimizer {
    pub fn new(config: &OptimizerConfig, system: &dyn System) -> Result<Self, OptimizerError> {
        let cost = Cost::new(config, system.m(), system.p())?;
        let (alpha, _beta) = config.gradient_rates()?;
        Ok(Self {
            name: config.label("Primal"),
            cost,
            alpha,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cost(&self) -> &Cost {
        &self.cost
    }

    pub fn data_initial(
        &self,
        system: &dyn System,
        u_0: Option<&Mat<f64>>,
    ) -> Result<IterationRecord, OptimizerError> {
        record::initial_record(&self.cost, system, u_0)
    }

    pub fn data_step(
        &self,
        system: &dyn System,
        data_in: &IterationRecord,
    ) -> Result<StepOutcome, OptimizerError> {
        let u = &data_in.u;
        let y = &data_in.y;
        let jac = system.jacobian(u);
        let jac_t = jac.transpose().to_owned();

        // Unconstrained gradient descent through the chain rule.
        let step = &self.cost.grad_u(u) + &(&jac_t * &self.cost.grad_y(y));
        let u_hat = u - &(faer::scale(self.alpha) * &step);

        // Output constraints linearized around the previous (u, y):
        //   Y.A (y + J (x - u)) <= Y.b  =>  (Y.A J) x <= Y.A (J u - y) + Y.b
        let output_set = system.output_set();
        let a_lin = output_set.a() * &jac;
        let residual = &(&jac * u) - y;
        let b_lin = &(output_set.a() * &residual) + output_set.b();
        let linearized = Polytope::new(a_lin, b_lin)?;

        let feasible = system.input_set().intersect(&linearized);
        if let Some(u_next) = feasible.projection(&u_hat)? {
            return Ok(StepOutcome::solved(data_in.with_u(u_next)));
        }

        warn!(
            optimizer = %self.name,
            "linearized output constraint infeasible; projecting onto input set alone"
        );
        match system.input_set().projection(&u_hat)? {
            Some(u_next) => Ok(StepOutcome {
                record: data_in.with_u(u_next),
                projection: ProjectionStatus::LinearizationDropped,
            }),
            None => Err(OptimizerError::QpUnsolved {
                context: "primal fallback projection onto the input set".into(),
            }),
        }
    }
}
