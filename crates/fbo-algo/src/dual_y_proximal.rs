//! Proximal (QP-based) variant of the constraint-dualizing iteration.

use faer::Mat;

use fbo_core::{linalg, Argmin, System};

use crate::config::OptimizerConfig;
use crate::cost::Cost;
use crate::optimizer::StepOutcome;
use crate::record::{self, IterationRecord};
use crate::OptimizerError;

/// Dualizes the output constraint like [`crate::DualYOptimizer`], but
/// solves the input update as a QP that combines the input cost, the
/// Jacobian-transformed output cost, a linearization of `phi_y` around the
/// current measurement, the dual-constraint term, and proximal
/// regularization toward the previous input (`gamma_u`).
///
/// The dual ascent uses the coupling rate `rho`. An unsolved input QP is
/// fatal: there is no weaker projection to fall back to. The input QP is
/// compiled once at construction and reused for every timestep's solve.
#[derive(Debug)]
pub struct DualYProximalOptimizer {
    name: String,
    cost: Cost,
    rho: f64,
    gamma_u: f64,
    prob_u: Argmin,
}

impl DualYProximalOptimizer {
    pub fn new(config: &OptimizerConfig, system: &dyn System) -> Result<Self, OptimizerError> {
        let cost = Cost::new(config, system.m(), system.p())?;
        let rho = config.proximal_rho()?;
        Ok(Self {
            name: config.label("DualYProximal"),
            cost,
            rho,
            gamma_u: config.gamma_u,
            prob_u: Argmin::new(system.input_set())?,
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
        jac: &Mat<f64>,
        u: &Mat<f64>,
        y: &Mat<f64>,
        lamb_y: &Mat<f64>,
    ) -> Result<Mat<f64>, OptimizerError> {
        let m = self.cost.m();
        let jac_t = jac.transpose().to_owned();
        let a_t = system.output_set().a().transpose().to_owned();

        // quad = quad_u + J' quad_y J + gamma_u/2 I
        let jt_qy = &jac_t * self.cost.quad_y();
        let pushforward = &jt_qy * jac;
        let ridge = faer::scale(self.gamma_u / 2.0) * &linalg::identity(m);
        let quad = &(self.cost.quad_u() + &pushforward) + &ridge;

        // lin = lin_u + J' lin_y - gamma_u u
        //     + 2 J' quad_y (y - J u) + J' A' lamb_y
        let mut lin = &(self.cost.lin_u() + &(&jac_t * self.cost.lin_y()))
            - &(faer::scale(self.gamma_u) * u);
        let offset = y - &(jac * u);
        lin = &lin + &(faer::scale(2.0) * &(&jt_qy * &offset));
        lin = &lin + &(&jac_t * &(&a_t * lamb_y));

        self.prob_u
            .solve(&quad, &lin)?
            .ok_or_else(|| OptimizerError::QpUnsolved {
                context: "input-actor proximal QP".into(),
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

        // Output actor: clipped dual ascent with the coupling rate.
        let ascent = system.output_set().constraint_value(&data_in.y);
        let lamb_hat = lamb_in + &(faer::scale(self.rho) * &ascent);
        let lamb_next = linalg::clip_min(&lamb_hat, 0.0);

        // Input actor, linearized at the previous u.
        let jac = system.jacobian(&data_in.u);
        let u_next = self.next_u(system, &jac, &data_in.u, &data_in.y, &lamb_next)?;

        // Realized price attribution from the dual-constraint pressure and
        // the linearized output cost.
        let jac_t = jac.transpose().to_owned();
        let a_t = system.output_set().a().transpose().to_owned();
        let mut price = &jac_t * &(&a_t * &lamb_next);
        price = &price + &(faer::scale(2.0) * &(&jac_t * &(self.cost.quad_y() * &data_in.y)));
        price = &price + &(&jac_t * self.cost.lin_y());
        let mut p = linalg::hadamard(&u_next, &price);
        let du = &u_next - &data_in.u;
        p = &p + &(faer::scale(self.gamma_u / 2.0) * &linalg::hadamard(&du, &du));

        let mut data_out = data_in.clone();
        data_out.lamb_y = Some(lamb_next);
        data_out.u = u_next;
        data_out.p = Some(p);
        Ok(StepOutcome::solved(data_out))
    }
}
