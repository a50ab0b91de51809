//! Closed-loop driver.

use faer::{FaerMat, Mat};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use tracing::{debug, info};

use fbo_algo::record::{self, IterationRecord};
use fbo_algo::{Optimizer, ProjectionStatus};
use fbo_core::{linalg, System};

use crate::SimulationError;

/// Run parameters.
///
/// `n_steps` is the one required parameter and is fixed at construction.
/// Both `u_0` and `u_opt` default to the zero input; `u_opt` only feeds
/// the suboptimality column `d`. The default noise standard deviation of
/// zero makes the run fully deterministic regardless of the seed.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Initial input, `(m, 1)`; zero when omitted.
    pub u_0: Option<Mat<f64>>,
    /// Reference optimal input for the `d` trajectory column, `(m, 1)`;
    /// zero when omitted.
    pub u_opt: Option<Mat<f64>>,
    /// Number of optimizer steps; the trajectory has `n_steps + 1` rows.
    pub n_steps: usize,
    /// Seed for the measurement-noise stream.
    pub noise_seed: u64,
    /// Standard deviation of the zero-mean Gaussian measurement noise.
    pub noise_y_std: f64,
}

impl SimulationConfig {
    /// Recipe for `n_steps` optimizer steps; every other parameter starts
    /// from its documented default.
    pub fn new(n_steps: usize) -> Self {
        Self {
            u_0: None,
            u_opt: None,
            n_steps,
            noise_seed: 0,
            noise_y_std: 0.0,
        }
    }
}

/// A configured closed loop: one optimizer, one plant, one run recipe.
pub struct Simulation<'a> {
    optimizer: &'a Optimizer,
    system: &'a dyn System,
    config: SimulationConfig,
}

/// The frozen trajectory of one run.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    optimizer_name: String,
    records: Vec<IterationRecord>,
    fallback_steps: Vec<usize>,
}

/// Headline figures of one run, serializable for report artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub optimizer: String,
    pub n_steps: usize,
    pub fallback_steps: usize,
    pub final_phi: f64,
    pub final_y_violation: f64,
}

struct NoiseStream {
    rng: StdRng,
    normal: Normal<f64>,
}

impl<'a> Simulation<'a> {
    pub fn new(
        optimizer: &'a Optimizer,
        system: &'a dyn System,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        if let Some(u_0) = &config.u_0 {
            check_input_vector(u_0, system.m(), "u_0")?;
        }
        if let Some(u_opt) = &config.u_opt {
            check_input_vector(u_opt, system.m(), "u_opt")?;
        }
        if !(config.noise_y_std >= 0.0) {
            return Err(SimulationError::DataValidation(format!(
                "noise_y_std must be nonnegative, got {}",
                config.noise_y_std
            )));
        }
        Ok(Self {
            optimizer,
            system,
            config,
        })
    }

    /// Execute the closed loop.
    ///
    /// Each step perturbs only the optimizer's view of the latest
    /// measurement; the logged trajectory always carries the true plant
    /// output. Noise is drawn per step from a stream seeded once at the
    /// start, so two runs of different lengths share their common prefix.
    pub fn run(&self) -> Result<SimulationRun, SimulationError> {
        info!(
            optimizer = %self.optimizer.name(),
            n_steps = self.config.n_steps,
            noise_y_std = self.config.noise_y_std,
            "starting closed-loop run"
        );

        let mut noise = self.noise_stream()?;
        let mut records = Vec::with_capacity(self.config.n_steps + 1);
        let mut fallback_steps = Vec::new();

        let mut current = self
            .optimizer
            .data_initial(self.system, self.config.u_0.as_ref())?;
        self.annotate_distance(&mut current);
        records.push(current.clone());

        for k in 0..self.config.n_steps {
            let view = match &mut noise {
                Some(stream) => {
                    let mut noisy = current.clone();
                    perturb(&mut noisy.y, stream);
                    noisy
                }
                None => current.clone(),
            };

            let outcome = self.optimizer.data_step(self.system, &view)?;
            if outcome.projection == ProjectionStatus::LinearizationDropped {
                fallback_steps.push(k + 1);
            }

            current = outcome.record;
            current.y = self.system.h(&current.u);
            record::annotate_cost(&mut current, self.optimizer.cost());
            record::annotate_violation(&mut current, self.system.output_set())?;
            self.annotate_distance(&mut current);
            records.push(current.clone());
        }

        debug!(
            optimizer = %self.optimizer.name(),
            final_phi = current.phi,
            final_y_violation = current.y_violation,
            fallbacks = fallback_steps.len(),
            "run finished"
        );
        Ok(SimulationRun {
            optimizer_name: self.optimizer.name().to_string(),
            records,
            fallback_steps,
        })
    }

    fn noise_stream(&self) -> Result<Option<NoiseStream>, SimulationError> {
        if self.config.noise_y_std == 0.0 {
            return Ok(None);
        }
        let normal = Normal::new(0.0, self.config.noise_y_std).map_err(|e| {
            SimulationError::DataValidation(format!("measurement noise distribution: {e}"))
        })?;
        Ok(Some(NoiseStream {
            rng: StdRng::seed_from_u64(self.config.noise_seed),
            normal,
        }))
    }

    fn annotate_distance(&self, record: &mut IterationRecord) {
        let d = match &self.config.u_opt {
            Some(u_opt) => linalg::norm2(&(&record.u - u_opt)),
            None => linalg::norm2(&record.u),
        };
        record.d = Some(d);
    }
}

impl SimulationRun {
    /// Label of the optimizer that produced this trajectory.
    pub fn optimizer_name(&self) -> &str {
        &self.optimizer_name
    }

    /// The per-timestep records, index `t = 0..=n_steps`.
    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// Timesteps at which the primal fallback projection was taken.
    pub fn fallback_steps(&self) -> &[usize] {
        &self.fallback_steps
    }

    pub fn summary(&self) -> RunSummary {
        let last = self.records.last().expect("a run has at least one record");
        RunSummary {
            optimizer: self.optimizer_name.clone(),
            n_steps: self.records.len() - 1,
            fallback_steps: self.fallback_steps.len(),
            final_phi: last.phi,
            final_y_violation: last.y_violation,
        }
    }
}

fn check_input_vector(v: &Mat<f64>, m: usize, what: &str) -> Result<(), SimulationError> {
    if v.nrows() != m || v.ncols() != 1 {
        return Err(SimulationError::DataValidation(format!(
            "{what} must have shape ({m}, 1), got ({}, {})",
            v.nrows(),
            v.ncols()
        )));
    }
    Ok(())
}

fn perturb(y: &mut Mat<f64>, stream: &mut NoiseStream) {
    for i in 0..y.nrows() {
        let sample = stream.normal.sample(&mut stream.rng);
        y.write(i, 0, y.read(i, 0) + sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;
    use fbo_algo::{OptimizerConfig, PrimalOptimizer};
    use fbo_core::{NonlinearSystem, Polytope};

    fn identity_plant() -> NonlinearSystem {
        NonlinearSystem::new(1, 1, |u: &Mat<f64>| u.clone(), |_: &Mat<f64>| mat![[1.0]])
            .with_input_set(Polytope::new(mat![[1.0], [-1.0]], mat![[1.0], [1.0]]).unwrap())
            .unwrap()
    }

    fn primal(sys: &NonlinearSystem) -> Optimizer {
        let config = OptimizerConfig {
            lin_u: Some(mat![[1.0]]),
            alpha: Some(0.1),
            ..Default::default()
        };
        PrimalOptimizer::new(&config, sys).unwrap().into()
    }

    #[test]
    fn new_config_carries_quiet_defaults() {
        let config = SimulationConfig::new(7);
        assert_eq!(config.n_steps, 7);
        assert_eq!(config.noise_seed, 0);
        assert_eq!(config.noise_y_std, 0.0);
        assert!(config.u_0.is_none());
        assert!(config.u_opt.is_none());
    }

    #[test]
    fn rejects_mismatched_initial_input() {
        let sys = identity_plant();
        let opt = primal(&sys);
        let config = SimulationConfig {
            u_0: Some(mat![[0.0], [0.0]]),
            ..SimulationConfig::new(10)
        };
        assert!(Simulation::new(&opt, &sys, config).is_err());
    }

    #[test]
    fn rejects_negative_noise_std() {
        let sys = identity_plant();
        let opt = primal(&sys);
        let config = SimulationConfig {
            noise_y_std: -0.5,
            ..SimulationConfig::new(10)
        };
        assert!(Simulation::new(&opt, &sys, config).is_err());
    }

    #[test]
    fn zero_steps_yields_only_the_initial_record() {
        let sys = identity_plant();
        let opt = primal(&sys);
        let config = SimulationConfig::new(0);
        let run = Simulation::new(&opt, &sys, config).unwrap().run().unwrap();
        assert_eq!(run.records().len(), 1);
        assert_eq!(run.summary().n_steps, 0);
    }

    #[test]
    fn distance_column_tracks_the_reference_input() {
        let sys = identity_plant();
        let opt = primal(&sys);
        let config = SimulationConfig {
            u_opt: Some(mat![[-1.0]]),
            ..SimulationConfig::new(3)
        };
        let run = Simulation::new(&opt, &sys, config).unwrap().run().unwrap();
        for r in run.records() {
            let expected = (r.u.read(0, 0) + 1.0).abs();
            assert!((r.d.unwrap() - expected).abs() < 1e-12);
        }
        // Descending a positive linear cost moves toward the reference.
        let first = run.records().first().unwrap().d.unwrap();
        let last = run.records().last().unwrap().d.unwrap();
        assert!(last < first);
    }
}
