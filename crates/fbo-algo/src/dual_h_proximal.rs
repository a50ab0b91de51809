//! Proximal (QP-based) variant of the map-dualizing iteration.

use faer::Mat;

use fbo_core::{linalg, Argmin, System};

use crate::config::OptimizerConfig;
use crate::cost::Cost;
use crate::optimizer::StepOutcome;
use crate::record::{self, IterationRecord};
use crate::OptimizerError;

/// Dualizes the map constraint `y = h(u)` like [`crate::DualHOptimizer`],
/// but replaces the gradient steps with closed-form QPs that carry
/// proximal regularization toward the previous iterates (`gamma_u`,
/// `gamma_z`) and, in centralized mode, augmented-Lagrangian coupling
/// terms built from the current Jacobian.
///
/// Distributed mode (`centralized = false`) omits the coupling terms,
/// trading exactness for not requiring global Jacobian knowledge at the
/// output actor. An unsolved QP is fatal here: there is no weaker
/// projection to fall back to.
///
/// Both QP problems are compiled once at construction and reused for
/// every timestep's solve.
#[derive(Debug)]
pub struct DualHProximalOptimizer {
    name: String,
    cost: Cost,
    rho: f64,
    gamma_u: f64,
    gamma_z: f64,
    centralized: bool,
    prob_u: Argmin,
    prob_z: Argmin,
}

impl DualHProximalOptimizer {
    pub fn new(config: &OptimizerConfig, system: &dyn System) -> Result<Self, OptimizerError> {
        let cost = Cost::new(config, system.m(), system.p())?;
        let rho = config.proximal_rho()?;
        Ok(Self {
            name: config.label("DualHProximal"),
            cost,
            rho,
            gamma_u: config.gamma_u,
            gamma_z: config.gamma_z,
            centralized: config.centralized,
            prob_u: Argmin::new(system.input_set())?,
            prob_z: Argmin::new(system.output_set())?,
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
        y: &Mat<f64>,
        z: &Mat<f64>,
        nu_h: &Mat<f64>,
    ) -> Result<Mat<f64>, OptimizerError> {
        let p = self.cost.p();
        let ridge = faer::scale((self.rho + self.gamma_z) / 2.0) * &linalg::identity(p);
        let quad = self.cost.quad_y() + &ridge;

        let lin = &(&(self.cost.lin_y() - nu_h) - &(faer::scale(self.rho) * y))
            - &(faer::scale(self.gamma_z) * z);

        self.prob_z
            .solve(&quad, &lin)?
            .ok_or_else(|| OptimizerError::QpUnsolved {
                context: "output-actor proximal QP".into(),
            })
    }

    fn next_u(
        &self,
        jac: &Mat<f64>,
        u: &Mat<f64>,
        y: &Mat<f64>,
        z: &Mat<f64>,
        nu_h: &Mat<f64>,
    ) -> Result<Mat<f64>, OptimizerError> {
        let m = self.cost.m();
        let jac_t = jac.transpose().to_owned();

        let ridge = faer::scale(self.gamma_u / 2.0) * &linalg::identity(m);
        let mut quad = self.cost.quad_u() + &ridge;
        if self.centralized {
            let jtj = &jac_t * jac;
            quad = &quad + &(faer::scale(self.rho / 2.0) * &jtj);
        }

        let mut lin = &(self.cost.lin_u() + &(&jac_t * nu_h)) - &(faer::scale(self.gamma_u) * u);
        if self.centralized {
            let mismatch = &(y - &(jac * u)) - z;
            lin = &lin + &(faer::scale(self.rho) * &(&jac_t * &mismatch));
        }

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
        let z_in = data_in.z.as_ref().expect("map-dualizing record carries z");
        let nu_in = data_in
            .nu_h
            .as_ref()
            .expect("map-dualizing record carries nu_h");

        // All Jacobian terms this step are linearized at the previous u.
        let jac = system.jacobian(&data_in.u);
        let jac_t = jac.transpose().to_owned();

        // Output actor: dual ascent against the previous z, then the
        // proximally regularized z update using the fresh multiplier.
        let mismatch = &data_in.y - z_in;
        let nu_next = nu_in + &(faer::scale(self.rho) * &mismatch);
        let z_next = self.next_z(&data_in.y, z_in, &nu_next)?;

        // Input actor.
        let u_next = self.next_u(&jac, &data_in.u, &data_in.y, &z_next, &nu_next)?;

        // Realized price attribution.
        let mut p = linalg::hadamard(&u_next, &(&jac_t * &nu_next));
        let du = &u_next - &data_in.u;
        p = &p + &(faer::scale(self.gamma_u / 2.0) * &linalg::hadamard(&du, &du));
        if self.centralized {
            let coupled = &jac_t * &(&jac * &du);
            p = &p + &(faer::scale(self.rho / 2.0) * &linalg::hadamard(&du, &coupled));
            let residual = &jac_t * &(&data_in.y - &z_next);
            p = &p + &(faer::scale(self.rho) * &linalg::hadamard(&u_next, &residual));
        }

        let mut data_out = data_in.clone();
        data_out.nu_h = Some(nu_next);
        data_out.z = Some(z_next);
        data_out.u = u_next;
        data_out.p = Some(p);
        Ok(StepOutcome::solved(data_out))
    }
}
