//! Iteration records carried from one timestep to the next.

use faer::Mat;

use fbo_core::linalg;
use fbo_core::{Polytope, System};

use crate::cost::Cost;
use crate::OptimizerError;

/// The named bundle of signals produced by one optimizer step.
///
/// `u`, `y`, `phi`, and `y_violation` are always present. The remaining
/// fields are owned by specific variants: `z` and `nu_h` by the
/// map-dualizing variants, `lamb_y` by the constraint-dualizing variants,
/// and the cost-attribution vector `p` by all dual variants. `d` (distance
/// to a known optimal input) is annotated by the simulation, not the
/// optimizers.
///
/// Records are immutable in the sense that every step derives a new record
/// from the prior one; the simulation log is a frozen series of them.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    /// Current input, `(m, 1)`.
    pub u: Mat<f64>,
    /// Current measured output, `(p, 1)`.
    pub y: Mat<f64>,
    /// Scalar cost `phi(u, y)`.
    pub phi: f64,
    /// Distance of `y` from the output constraint set.
    pub y_violation: f64,
    /// Distance to the reference optimal input, if tracked.
    pub d: Option<f64>,
    /// Auxiliary output copy (map-dualizing variants).
    pub z: Option<Mat<f64>>,
    /// Dual vector on the steady-state map, `(p, 1)`.
    pub nu_h: Option<Mat<f64>>,
    /// Dual vector on the output constraint, componentwise nonnegative.
    pub lamb_y: Option<Mat<f64>>,
    /// Realized cost-attribution vector, `(m, 1)`.
    pub p: Option<Mat<f64>>,
}

impl IterationRecord {
    /// Derive a new record with the input replaced; every other field is
    /// carried over and re-annotated by the caller.
    pub fn with_u(&self, u: Mat<f64>) -> Self {
        let mut next = self.clone();
        next.u = u;
        next
    }
}

/// Build the timestep-0 record for a given (or zero) initial input,
/// evaluating the system once.
pub fn initial_record(
    cost: &Cost,
    system: &dyn System,
    u_0: Option<&Mat<f64>>,
) -> Result<IterationRecord, OptimizerError> {
    let u = match u_0 {
        Some(u) => {
            assert_eq!(u.nrows(), system.m(), "u_0: dimension mismatch");
            assert_eq!(u.ncols(), 1, "u_0 must be a column vector");
            u.clone()
        }
        None => linalg::zeros(system.m()),
    };
    let y = system.h(&u);
    let mut record = IterationRecord {
        u,
        y,
        phi: 0.0,
        y_violation: 0.0,
        d: None,
        z: None,
        nu_h: None,
        lamb_y: None,
        p: None,
    };
    annotate_cost(&mut record, cost);
    annotate_violation(&mut record, system.output_set())?;
    Ok(record)
}

/// Recompute `phi` from the record's own `u` and `y`.
pub fn annotate_cost(record: &mut IterationRecord, cost: &Cost) {
    record.phi = cost.phi(&record.u, &record.y);
}

/// Recompute `y_violation = ||proj_Y(y) - y||`.
pub fn annotate_violation(
    record: &mut IterationRecord,
    output_set: &Polytope,
) -> Result<(), OptimizerError> {
    let projected =
        output_set
            .projection(&record.y)?
            .ok_or_else(|| OptimizerError::QpUnsolved {
                context: "output-set projection for violation".into(),
            })?;
    record.y_violation = linalg::norm2(&(&projected - &record.y));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use faer::{mat, FaerMat};
    use fbo_core::NonlinearSystem;

    fn identity_system() -> NonlinearSystem {
        NonlinearSystem::new(1, 1, |u| u.clone(), |_| mat![[1.0]])
            .with_output_set(Polytope::new(mat![[1.0]], mat![[1.0]]).unwrap())
            .unwrap()
    }

    #[test]
    fn initial_record_defaults_to_zero_input() {
        let cost = Cost::new(&OptimizerConfig::default(), 1, 1).unwrap();
        let sys = identity_system();
        let record = initial_record(&cost, &sys, None).unwrap();
        assert_eq!(record.u.read(0, 0), 0.0);
        assert_eq!(record.y.read(0, 0), 0.0);
        assert_eq!(record.phi, 0.0);
        assert!(record.y_violation.abs() < 1e-6);
    }

    #[test]
    fn cost_annotation_matches_direct_evaluation() {
        let config = OptimizerConfig {
            lin_u: Some(mat![[0.5]]),
            quad_y: Some(mat![[1.0]]),
            ..Default::default()
        };
        let cost = Cost::new(&config, 1, 1).unwrap();
        let sys = identity_system();
        let u_0 = mat![[0.5]];
        let record = initial_record(&cost, &sys, Some(&u_0)).unwrap();
        let expected = cost.phi_u(&u_0) + cost.phi_y(&sys.h(&u_0));
        assert!((record.phi - expected).abs() < 1e-12);
    }

    #[test]
    fn violation_is_zero_inside_and_positive_outside() {
        let cost = Cost::new(&OptimizerConfig::default(), 1, 1).unwrap();
        let sys = identity_system();

        let inside = initial_record(&cost, &sys, Some(&mat![[0.5]])).unwrap();
        assert!(inside.y_violation < 1e-6);

        let outside = initial_record(&cost, &sys, Some(&mat![[3.0]])).unwrap();
        assert!((outside.y_violation - 2.0).abs() < 1e-5);
    }
}
