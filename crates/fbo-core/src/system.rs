//! Steady-state system oracle contract.

use faer::{FaerMat, Mat};

use crate::polytope::Polytope;
use crate::CoreError;

/// A steady-state input-output map consumed by the optimizers.
///
/// Implementations supply the measured output `h(u)` and its sensitivity
/// `∇h(u)` for an input `u` of dimension `m`, together with the static
/// input and output constraint polytopes. Both map evaluations must be
/// deterministic pure functions of `u` at call time, even when backed by
/// an iterative physical solver, and must panic on dimension mismatch.
pub trait System {
    /// Input dimension `m`.
    fn m(&self) -> usize;

    /// Output dimension `p`.
    fn p(&self) -> usize;

    /// Steady-state output `y = h(u)`, shape `(p, 1)`.
    fn h(&self, u: &Mat<f64>) -> Mat<f64>;

    /// Steady-state sensitivity `∇h(u)`, shape `(p, m)`.
    fn jacobian(&self, u: &Mat<f64>) -> Mat<f64>;

    /// Static input constraint set `U` over `R^m`.
    fn input_set(&self) -> &Polytope;

    /// Static output constraint set `Y` over `R^p`.
    fn output_set(&self) -> &Polytope;
}

type MapFn = Box<dyn Fn(&Mat<f64>) -> Mat<f64> + Send + Sync>;

/// A closed-form nonlinear steady-state map given by a pair of closures.
///
/// This is the canonical [`System`] implementation for toy models and
/// tests; physical-plant implementations (power-flow linearizations and
/// the like) live outside this workspace and only need to satisfy the
/// trait.
pub struct NonlinearSystem {
    m: usize,
    p: usize,
    h: MapFn,
    jacobian: MapFn,
    input_set: Polytope,
    output_set: Polytope,
}

impl NonlinearSystem {
    /// Build an unconstrained map; `U` and `Y` default to the full space.
    pub fn new(
        m: usize,
        p: usize,
        h: impl Fn(&Mat<f64>) -> Mat<f64> + Send + Sync + 'static,
        jacobian: impl Fn(&Mat<f64>) -> Mat<f64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            m,
            p,
            h: Box::new(h),
            jacobian: Box::new(jacobian),
            input_set: Polytope::full_space(m),
            output_set: Polytope::full_space(p),
        }
    }

    /// Replace the input constraint set.
    pub fn with_input_set(mut self, set: Polytope) -> Result<Self, CoreError> {
        if set.n() != self.m {
            return Err(CoreError::DataValidation(format!(
                "input set has dimension {} but m = {}",
                set.n(),
                self.m
            )));
        }
        self.input_set = set;
        Ok(self)
    }

    /// Replace the output constraint set.
    pub fn with_output_set(mut self, set: Polytope) -> Result<Self, CoreError> {
        if set.n() != self.p {
            return Err(CoreError::DataValidation(format!(
                "output set has dimension {} but p = {}",
                set.n(),
                self.p
            )));
        }
        self.output_set = set;
        Ok(self)
    }
}

impl System for NonlinearSystem {
    fn m(&self) -> usize {
        self.m
    }

    fn p(&self) -> usize {
        self.p
    }

    fn h(&self, u: &Mat<f64>) -> Mat<f64> {
        assert_eq!(u.nrows(), self.m, "h: input dimension mismatch");
        assert_eq!(u.ncols(), 1, "h expects a column vector");
        let y = (self.h)(u);
        assert_eq!(y.nrows(), self.p, "h: map returned wrong output dimension");
        assert_eq!(y.ncols(), 1, "h: map must return a column vector");
        y
    }

    fn jacobian(&self, u: &Mat<f64>) -> Mat<f64> {
        assert_eq!(u.nrows(), self.m, "jacobian: input dimension mismatch");
        assert_eq!(u.ncols(), 1, "jacobian expects a column vector");
        let j = (self.jacobian)(u);
        assert_eq!(j.nrows(), self.p, "jacobian: wrong row count");
        assert_eq!(j.ncols(), self.m, "jacobian: wrong column count");
        j
    }

    fn input_set(&self) -> &Polytope {
        &self.input_set
    }

    fn output_set(&self) -> &Polytope {
        &self.output_set
    }
}

impl std::fmt::Debug for NonlinearSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonlinearSystem")
            .field("m", &self.m)
            .field("p", &self.p)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    fn quadratic_toy() -> NonlinearSystem {
        NonlinearSystem::new(
            1,
            1,
            |u| {
                let v = u.read(0, 0);
                mat![[2.0 * v * v + v * v * v]]
            },
            |u| {
                let v = u.read(0, 0);
                mat![[4.0 * v + 3.0 * v * v]]
            },
        )
    }

    #[test]
    fn evaluates_map_and_sensitivity() {
        let sys = quadratic_toy();
        let u = mat![[-1.0]];
        assert!((sys.h(&u).read(0, 0) - 1.0).abs() < 1e-12);
        assert!((sys.jacobian(&u).read(0, 0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn defaults_to_full_space_constraints() {
        let sys = quadratic_toy();
        assert_eq!(sys.input_set().num_constraints(), 1);
        assert!(sys.input_set().contains(&mat![[1e6]], 0.0));
    }

    #[test]
    fn rejects_mismatched_constraint_dimension() {
        let set = Polytope::full_space(3);
        assert!(quadratic_toy().with_input_set(set).is_err());
    }

    #[test]
    #[should_panic(expected = "input dimension mismatch")]
    fn panics_on_wrong_input_shape() {
        let sys = quadratic_toy();
        sys.h(&mat![[0.0], [0.0]]);
    }
}
