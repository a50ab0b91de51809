//! Gradient-step primal-dual iteration that dualizes the output constraint.

use faer::Mat;

use fbo_core::{linalg, System};

use crate::config::OptimizerConfig;
use crate::cost::Cost;
use crate::optimizer::StepOutcome;
use crate::record::{self, IterationRecord};
use crate::OptimizerError;

/// Dualizes only the output constraint `c_y(y) <= 0` with the nonnegative
/// multiplier `lamb_y`, keeping the map itself primal.
///
/// Per step: projected dual ascent `lamb_y = [lamb_y + beta c_y(y)]_+`,
/// then gradient descent on `u` (projected onto `U`) using
/// `∇phi_u + (∇h)' (∇phi_y(y) + A' lamb_y)`.
#[derive(Debug)]
pub struct DualYOptimizer {
    name: String,
    cost: Cost,
    alpha: f64,
    beta: f64,
}

impl DualYOptimizer {
    pub fn new(config: &OptimizerConfig, system: &dyn System) -> Result<Self, OptimizerError> {
        let cost = Cost::new(config, system.m(), system.p())?;
        let (alpha, beta) = config.gradient_rates()?;
        Ok(Self {
            name: config.label("DualY"),
            cost,
            alpha,
            beta,
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
        let mut data_k0 = record::initial_record(&self.cost, system, u_0)?;
        data_k0.lamb_y = Some(linalg::zeros(system.output_set().num_constraints()));
        data_k0.p = Some(linalg::zeros(system.m()));
        Ok(data_k0)
    }

    fn next_u(
        &self,
        system: &dyn System,
        u: &Mat<f64>,
        y: &Mat<f64>,
        lamb_y: &Mat<f64>,
    ) -> Result<Mat<f64>, OptimizerError> {
        let jac_t = system.jacobian(u).transpose().to_owned();
        let a_t = system.output_set().a().transpose().to_owned();
        let dual_pressure = &self.cost.grad_y(y) + &(&a_t * lamb_y);
        let step_u = &self.cost.grad_u(u) + &(&jac_t * &dual_pressure);
        let u_hat = u - &(faer::scale(self.alpha) * &step_u);
        system
            .input_set()
            .projection(&u_hat)?
            .ok_or_else(|| OptimizerError::QpUnsolved {
                context: "input-actor projection onto the input set".into(),
            })
    }

    pub fn data_step(
        &self,
        system: &dyn System,
        data_in: &IterationRecord,
    ) -> Result<StepOutcome, OptimizerError> {
        let lamb_in = data_in
            .lamb_y
            .as_ref()
            .expect("constraint-dualizing record carries lamb_y");

        // Output actor: clipped dual ascent keeps the multiplier
        // componentwise nonnegative.
        let ascent = system.output_set().constraint_value(&data_in.y);
        let lamb_hat = lamb_in + &(faer::scale(self.beta) * &ascent);
        let lamb_next = linalg::clip_min(&lamb_hat, 0.0);

        // Input actor.
        let u_next = self.next_u(system, &data_in.u, &data_in.y, &lamb_next)?;

        // Realized price attribution, evaluated at the previous input.
        let jac_t = system.jacobian(&data_in.u).transpose().to_owned();
        let a_t = system.output_set().a().transpose().to_owned();
        let price = &jac_t * &(&a_t * &lamb_next);
        let p = linalg::hadamard(&u_next, &price);

        let mut data_out = data_in.clone();
        data_out.lamb_y = Some(lamb_next);
        data_out.u = u_next;
        data_out.p = Some(p);
        Ok(StepOutcome::solved(data_out))
    }
}
