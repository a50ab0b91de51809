//! Small dense helpers over `faer::Mat<f64>`.
//!
//! Column vectors are `(n, 1)` matrices throughout the workspace. These
//! helpers cover the handful of operations the optimizers need beyond
//! faer's arithmetic operators.

use faer::{FaerMat, Mat, Side};

use crate::CoreError;

/// Symmetry tolerance used when validating quadratic cost matrices.
pub const SYMMETRY_TOL: f64 = 1e-9;

/// Diagonal shift applied before the Cholesky-based PSD check, so that
/// singular but semidefinite matrices (e.g. the all-zero default cost)
/// still factor.
const PSD_SHIFT: f64 = 1e-9;

/// `n x n` identity matrix.
pub fn identity(n: usize) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 })
}

/// `(n, 1)` zero column vector.
pub fn zeros(n: usize) -> Mat<f64> {
    Mat::zeros(n, 1)
}

/// Euclidean norm of a column vector.
pub fn norm2(x: &Mat<f64>) -> f64 {
    assert_eq!(x.ncols(), 1, "norm2 expects a column vector");
    let mut acc = 0.0;
    for i in 0..x.nrows() {
        let v = x.read(i, 0);
        acc += v * v;
    }
    acc.sqrt()
}

/// Inner product of two equally shaped column vectors.
pub fn dot(a: &Mat<f64>, b: &Mat<f64>) -> f64 {
    assert_eq!(a.nrows(), b.nrows(), "dot: row mismatch");
    assert_eq!(a.ncols(), 1, "dot expects column vectors");
    assert_eq!(b.ncols(), 1, "dot expects column vectors");
    (0..a.nrows()).map(|i| a.read(i, 0) * b.read(i, 0)).sum()
}

/// Componentwise product of two equally shaped column vectors.
pub fn hadamard(a: &Mat<f64>, b: &Mat<f64>) -> Mat<f64> {
    assert_eq!(a.nrows(), b.nrows(), "hadamard: row mismatch");
    assert_eq!(a.ncols(), 1, "hadamard expects column vectors");
    assert_eq!(b.ncols(), 1, "hadamard expects column vectors");
    Mat::from_fn(a.nrows(), 1, |i, _| a.read(i, 0) * b.read(i, 0))
}

/// Componentwise lower clip.
pub fn clip_min(x: &Mat<f64>, lo: f64) -> Mat<f64> {
    Mat::from_fn(x.nrows(), x.ncols(), |i, j| x.read(i, j).max(lo))
}

/// Stack `top` over `bottom`; both must have the same column count.
pub fn vstack(top: &Mat<f64>, bottom: &Mat<f64>) -> Mat<f64> {
    assert_eq!(top.ncols(), bottom.ncols(), "vstack: column mismatch");
    Mat::from_fn(top.nrows() + bottom.nrows(), top.ncols(), |i, j| {
        if i < top.nrows() {
            top.read(i, j)
        } else {
            bottom.read(i - top.nrows(), j)
        }
    })
}

/// Whether `a` equals its transpose within `tol`.
pub fn is_symmetric(a: &Mat<f64>, tol: f64) -> bool {
    if a.nrows() != a.ncols() {
        return false;
    }
    for i in 0..a.nrows() {
        for j in (i + 1)..a.ncols() {
            if (a.read(i, j) - a.read(j, i)).abs() > tol {
                return false;
            }
        }
    }
    true
}

/// Validate that `a` is a symmetric positive-semidefinite matrix.
///
/// The PSD check factors `a + shift*I`; the shift keeps singular
/// semidefinite matrices factorable while still rejecting anything with a
/// meaningfully negative eigenvalue.
pub fn validate_psd(a: &Mat<f64>, label: &str) -> Result<(), CoreError> {
    if !is_symmetric(a, SYMMETRY_TOL) {
        return Err(CoreError::DataValidation(format!(
            "{label} must be symmetric"
        )));
    }
    let n = a.nrows();
    let shifted = Mat::from_fn(n, n, |i, j| {
        a.read(i, j) + if i == j { PSD_SHIFT } else { 0.0 }
    });
    if shifted.cholesky(Side::Lower).is_err() {
        return Err(CoreError::DataValidation(format!(
            "{label} must be positive semidefinite"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn norm2_matches_hand_computation() {
        let v = mat![[3.0], [4.0]];
        assert!((norm2(&v) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn vstack_preserves_order() {
        let top = mat![[1.0, 2.0]];
        let bottom = mat![[3.0, 4.0], [5.0, 6.0]];
        let stacked = vstack(&top, &bottom);
        assert_eq!(stacked.nrows(), 3);
        assert_eq!(stacked.read(0, 1), 2.0);
        assert_eq!(stacked.read(2, 0), 5.0);
    }

    #[test]
    fn clip_min_floors_negative_entries() {
        let v = mat![[-1.0], [0.5]];
        let clipped = clip_min(&v, 0.0);
        assert_eq!(clipped.read(0, 0), 0.0);
        assert_eq!(clipped.read(1, 0), 0.5);
    }

    #[test]
    fn zero_matrix_counts_as_psd() {
        let z = Mat::<f64>::zeros(3, 3);
        assert!(validate_psd(&z, "quad").is_ok());
    }

    #[test]
    fn indefinite_matrix_is_rejected() {
        let a = mat![[1.0, 0.0], [0.0, -1.0]];
        assert!(validate_psd(&a, "quad").is_err());
    }

    #[test]
    fn asymmetric_matrix_is_rejected() {
        let a = mat![[1.0, 2.0], [0.0, 1.0]];
        assert!(validate_psd(&a, "quad").is_err());
    }
}
