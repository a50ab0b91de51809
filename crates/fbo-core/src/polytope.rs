//! Convex polytopes in H-representation.

use faer::{FaerMat, Mat};
use once_cell::sync::OnceCell;

use crate::linalg;
use crate::qp::Argmin;
use crate::CoreError;

/// A convex feasible region `{x in R^n : A x <= b}`.
///
/// Immutable after construction. The Euclidean projection problem is
/// compiled lazily on first use and reused for every subsequent
/// [`Polytope::projection`] call, since setting up the QP is much more
/// expensive than re-solving it with fresh coefficients.
pub struct Polytope {
    a: Mat<f64>,
    b: Mat<f64>,
    n: usize,
    project: OnceCell<Argmin>,
}

impl Polytope {
    /// Build a polytope from `A` (`k x n`) and `b` (`k x 1`).
    pub fn new(a: Mat<f64>, b: Mat<f64>) -> Result<Self, CoreError> {
        if a.nrows() != b.nrows() {
            return Err(CoreError::DataValidation(format!(
                "A has {} rows but b has {}",
                a.nrows(),
                b.nrows()
            )));
        }
        if b.ncols() != 1 {
            return Err(CoreError::DataValidation(format!(
                "b must be a column vector, got {} columns",
                b.ncols()
            )));
        }
        if a.ncols() == 0 {
            return Err(CoreError::DataValidation(
                "polytope dimension must be positive".into(),
            ));
        }
        let n = a.ncols();
        Ok(Self {
            a,
            b,
            n,
            project: OnceCell::new(),
        })
    }

    /// The unconstrained region of dimension `n`, encoded as the single
    /// trivially satisfied row `0 * x <= 1`.
    pub fn full_space(n: usize) -> Self {
        let a = Mat::zeros(1, n);
        let b = Mat::from_fn(1, 1, |_, _| 1.0);
        Self::new(a, b).expect("full space construction is always valid")
    }

    /// Ambient dimension `n`.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of inequality rows `k`.
    pub fn num_constraints(&self) -> usize {
        self.a.nrows()
    }

    /// Constraint matrix `A`.
    pub fn a(&self) -> &Mat<f64> {
        &self.a
    }

    /// Constraint offsets `b`.
    pub fn b(&self) -> &Mat<f64> {
        &self.b
    }

    /// `A x - b`; the point is feasible iff every component is `<= 0`.
    pub fn constraint_value(&self, x: &Mat<f64>) -> Mat<f64> {
        assert_eq!(x.nrows(), self.n, "constraint_value: dimension mismatch");
        assert_eq!(x.ncols(), 1, "constraint_value expects a column vector");
        &(&self.a * x) - &self.b
    }

    /// Whether `x` satisfies every row within `tol`.
    pub fn contains(&self, x: &Mat<f64>, tol: f64) -> bool {
        let c = self.constraint_value(x);
        (0..c.nrows()).all(|i| c.read(i, 0) <= tol)
    }

    /// Intersection with another polytope over the same ambient space,
    /// formed by stacking inequality rows.
    pub fn intersect(&self, other: &Self) -> Self {
        assert_eq!(self.n, other.n, "intersect: dimension mismatch");
        let a = linalg::vstack(&self.a, &other.a);
        let b = linalg::vstack(&self.b, &other.b);
        Self::new(a, b).expect("stacked rows keep matching shapes")
    }

    /// Euclidean-closest feasible point to `z`.
    ///
    /// `Ok(None)` means the projection QP has no solution, which is an
    /// expected outcome for intersections that turned out empty; callers
    /// decide whether that is recoverable.
    pub fn projection(&self, z: &Mat<f64>) -> Result<Option<Mat<f64>>, CoreError> {
        assert_eq!(z.nrows(), self.n, "projection: dimension mismatch");
        assert_eq!(z.ncols(), 1, "projection expects a column vector");

        let qp = self.project.get_or_try_init(|| Argmin::new(self))?;
        let quad = linalg::identity(self.n);
        let lin = faer::scale(-2.0) * z;
        qp.solve(&quad, &lin)
    }
}

impl Clone for Polytope {
    fn clone(&self) -> Self {
        // The compiled projection problem is rebuilt on demand.
        Self {
            a: self.a.clone(),
            b: self.b.clone(),
            n: self.n,
            project: OnceCell::new(),
        }
    }
}

impl std::fmt::Debug for Polytope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Polytope")
            .field("n", &self.n)
            .field("num_constraints", &self.num_constraints())
            .finish()
    }
}
