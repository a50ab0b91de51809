//! Gradient-step primal-dual iteration that dualizes the steady-state map.

use faer::Mat;

use fbo_core::{linalg, System};

use crate::config::OptimizerConfig;
use crate::cost::Cost;
use crate::optimizer::StepOutcome;
use crate::record::{self, IterationRecord};
use crate::OptimizerError;

/// Dualizes the map constraint `y = h(u)` with the multiplier `nu_h`,
/// decoupling an output actor that optimizes an auxiliary copy `z` from
/// the true measured map.
///
/// Per step: gradient descent on `z` (projected onto `Y`), gradient
/// ascent `nu_h += beta (y - z)`, then gradient descent on `u` (projected
/// onto `U`) using `∇phi_u + (∇h)' nu_h`.
#[derive(Debug)]
pub struct DualHOptimizer {
    name: String,
    cost: Cost,
    alpha: f64,
    beta: f64,
}

impl DualHOptimizer {
    pub fn new(config: &OptimizerConfig, system: &dyn System) -> Result<Self, OptimizerError> {
        let cost = Cost::new(config, system.m(), system.p())?;
        let (alpha, beta) = config.gradient_rates()?;
        Ok(Self {
            name: config.label("DualH"),
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
        let z = system
            .output_set()
            .projection(&data_k0.y)?
            .ok_or_else(|| OptimizerError::QpUnsolved {
                context: "initial projection of y onto the output set".into(),
            })?;
        data_k0.z = Some(z);
        data_k0.nu_h = Some(linalg::zeros(system.p()));
        data_k0.p = Some(linalg::zeros(system.m()));
        Ok(data_k0)
    }

    fn next_z(
        &self,
        system: &dyn System,
        z: &Mat<f64>,
        nu_h: &Mat<f64>,
    ) -> Result<Mat<f64>, OptimizerError> {
        let step_z = &self.cost.grad_y(z) - nu_h;
        let z_hat = z - &(faer::scale(self.alpha) * &step_z);
        system
            .output_set()
            .projection(&z_hat)?
            .ok_or_else(|| OptimizerError::QpUnsolved {
                context: "output-actor projection onto the output set".into(),
            })
    }

    fn next_u(
        &self,
        system: &dyn System,
        u: &Mat<f64>,
        nu_h: &Mat<f64>,
    ) -> Result<Mat<f64>, OptimizerError> {
        let jac_t = system.jacobian(u).transpose().to_owned();
        let step_u = &self.cost.grad_u(u) + &(&jac_t * nu_h);
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
        let z_in = data_in.z.as_ref().expect("map-dualizing record carries z");
        let nu_in = data_in
            .nu_h
            .as_ref()
            .expect("map-dualizing record carries nu_h");

        // Output actor: auxiliary copy first, then dual ascent toward the
        // measured mismatch y - z.
        let z_next = self.next_z(system, z_in, nu_in)?;
        let mismatch = &data_in.y - &z_next;
        let nu_next = nu_in + &(faer::scale(self.beta) * &mismatch);

        // Input actor.
        let u_next = self.next_u(system, &data_in.u, &nu_next)?;

        // Realized price attribution, evaluated at the previous input.
        let jac_t = system.jacobian(&data_in.u).transpose().to_owned();
        let price = &jac_t * &nu_next;
        let p = linalg::hadamard(&u_next, &price);

        let mut data_out = data_in.clone();
        data_out.z = Some(z_next);
        data_out.nu_h = Some(nu_next);
        data_out.u = u_next;
        data_out.p = Some(p);
        Ok(StepOutcome::solved(data_out))
    }
}
