//! Compiled constrained-QP solver.
//!
//! Clarabel solves the conic program
//!
//! ```text
//!   minimize    (1/2) x' P x + q' x
//!   subject to  A x + s = b,  s in K
//! ```
//!
//! Here `K` is a single nonnegative cone, which encodes the polytope rows
//! `A x <= b`. The constraint block never changes for a given [`Argmin`],
//! so it is compiled to CSC form once at construction; each `solve` call
//! only assembles the objective.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettings, DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use faer::{FaerMat, Mat};

use crate::linalg;
use crate::polytope::Polytope;
use crate::CoreError;

/// A reusable QP solver bound to one fixed constraint polytope.
///
/// Solves `minimize x' quad x + lin' x  s.t.  A x <= b` where only `quad`
/// and `lin` vary between calls. Construction is the expensive part;
/// callers are expected to build one instance per constraint set and hold
/// on to it across iterations.
pub struct Argmin {
    n: usize,
    a_csc: CscMatrix<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
    settings: DefaultSettings<f64>,
    verify_psd: bool,
}

impl Argmin {
    /// Compile the constraint block of `constraints` into solver form.
    pub fn new(constraints: &Polytope) -> Result<Self, CoreError> {
        let n = constraints.n();
        let k = constraints.num_constraints();
        let a = constraints.a();

        // Column-major sparse assembly of the fixed constraint matrix.
        let mut col_ptr = Vec::with_capacity(n + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        col_ptr.push(0);
        for col in 0..n {
            for row in 0..k {
                let v = a.read(row, col);
                if v != 0.0 {
                    row_idx.push(row);
                    values.push(v);
                }
            }
            col_ptr.push(row_idx.len());
        }
        let a_csc = CscMatrix::new(k, n, col_ptr, row_idx, values);

        let b = (0..k).map(|i| constraints.b().read(i, 0)).collect();
        let cones = vec![SupportedConeT::NonnegativeConeT(k)];

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .build()
            .map_err(|e| CoreError::SolverSetup(format!("settings error: {e:?}")))?;

        Ok(Self {
            n,
            a_csc,
            b,
            cones,
            settings,
            verify_psd: false,
        })
    }

    /// Enable the PSD verification of `quad` on every call. Off by default
    /// since repeated per-step solves make this a hot path.
    pub fn with_psd_check(mut self) -> Self {
        self.verify_psd = true;
        self
    }

    /// Ambient dimension of the bound polytope.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Minimize `x' quad x + lin' x` over the bound polytope.
    ///
    /// `quad` must be symmetric; it is assumed PSD by the caller's
    /// contract unless the PSD check was enabled. Returns `Ok(None)` when
    /// the backend does not report an optimal solution; infeasibility,
    /// unboundedness, and numerical non-convergence are indistinguishable
    /// at this interface.
    pub fn solve(&self, quad: &Mat<f64>, lin: &Mat<f64>) -> Result<Option<Mat<f64>>, CoreError> {
        assert_eq!(quad.nrows(), self.n, "solve: quad row mismatch");
        assert_eq!(quad.ncols(), self.n, "solve: quad column mismatch");
        assert_eq!(lin.nrows(), self.n, "solve: lin row mismatch");
        assert_eq!(lin.ncols(), 1, "solve: lin must be a column vector");
        assert!(
            linalg::is_symmetric(quad, linalg::SYMMETRY_TOL),
            "solve: quad must be symmetric"
        );
        if self.verify_psd {
            linalg::validate_psd(quad, "quad")?;
        }

        // Clarabel minimizes (1/2) x'Px + q'x and reads the upper triangle
        // of P, so P = 2 * quad assembled as upper-triangular CSC.
        let mut p_col_ptr = Vec::with_capacity(self.n + 1);
        let mut p_row_idx = Vec::new();
        let mut p_values = Vec::new();
        p_col_ptr.push(0);
        for col in 0..self.n {
            for row in 0..=col {
                let v = quad.read(row, col);
                if v != 0.0 {
                    p_row_idx.push(row);
                    p_values.push(2.0 * v);
                }
            }
            p_col_ptr.push(p_row_idx.len());
        }
        let p_mat = CscMatrix::new(self.n, self.n, p_col_ptr, p_row_idx, p_values);

        let q: Vec<f64> = (0..self.n).map(|i| lin.read(i, 0)).collect();

        let mut solver = DefaultSolver::new(
            &p_mat,
            &q,
            &self.a_csc,
            &self.b,
            &self.cones,
            self.settings.clone(),
        )
        .map_err(|e| CoreError::SolverSetup(format!("solver initialization failed: {e:?}")))?;

        solver.solve();

        let sol = solver.solution;
        if !matches!(
            sol.status,
            SolverStatus::Solved | SolverStatus::AlmostSolved
        ) {
            return Ok(None);
        }

        let mut x = Mat::zeros(self.n, 1);
        for i in 0..self.n {
            x.write(i, 0, sol.x[i]);
        }
        Ok(Some(x))
    }
}

impl std::fmt::Debug for Argmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argmin")
            .field("n", &self.n)
            .field("num_constraints", &self.b.len())
            .field("verify_psd", &self.verify_psd)
            .finish()
    }
}
