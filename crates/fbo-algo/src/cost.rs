//! Quadratic-plus-linear cost coefficients shared by every variant.

use faer::{FaerMat, Mat};

use fbo_core::linalg;

use crate::config::OptimizerConfig;
use crate::OptimizerError;

/// Validated cost coefficients for `phi(u, y) = phi_u(u) + phi_y(y)` with
/// `phi_u(u) = u' quad_u u + lin_u' u` and `phi_y(y) = y' quad_y y +
/// lin_y' y`.
///
/// Quadratic matrices are checked for symmetry and positive
/// semidefiniteness at construction; they are never re-validated on the
/// evaluation path.
#[derive(Debug, Clone)]
pub struct Cost {
    quad_u: Mat<f64>,
    lin_u: Mat<f64>,
    quad_y: Mat<f64>,
    lin_y: Mat<f64>,
    m: usize,
    p: usize,
}

impl Cost {
    /// Extract and validate the cost coefficients from `config` for a
    /// system with input dimension `m` and output dimension `p`.
    /// Missing coefficients default to zero.
    pub fn new(config: &OptimizerConfig, m: usize, p: usize) -> Result<Self, OptimizerError> {
        let quad_u = match &config.quad_u {
            Some(q) => {
                check_shape(q, m, m, "quad_u")?;
                linalg::validate_psd(q, "quad_u")?;
                q.clone()
            }
            None => Mat::zeros(m, m),
        };
        let lin_u = match &config.lin_u {
            Some(l) => {
                check_shape(l, m, 1, "lin_u")?;
                l.clone()
            }
            None => Mat::zeros(m, 1),
        };
        let quad_y = match &config.quad_y {
            Some(q) => {
                check_shape(q, p, p, "quad_y")?;
                linalg::validate_psd(q, "quad_y")?;
                q.clone()
            }
            None => Mat::zeros(p, p),
        };
        let lin_y = match &config.lin_y {
            Some(l) => {
                check_shape(l, p, 1, "lin_y")?;
                l.clone()
            }
            None => Mat::zeros(p, 1),
        };
        Ok(Self {
            quad_u,
            lin_u,
            quad_y,
            lin_y,
            m,
            p,
        })
    }

    /// Input dimension `m`.
    pub fn m(&self) -> usize {
        self.m
    }

    /// Output dimension `p`.
    pub fn p(&self) -> usize {
        self.p
    }

    /// Input cost quadratic.
    pub fn quad_u(&self) -> &Mat<f64> {
        &self.quad_u
    }

    /// Input cost linear term.
    pub fn lin_u(&self) -> &Mat<f64> {
        &self.lin_u
    }

    /// Output cost quadratic.
    pub fn quad_y(&self) -> &Mat<f64> {
        &self.quad_y
    }

    /// Output cost linear term.
    pub fn lin_y(&self) -> &Mat<f64> {
        &self.lin_y
    }

    /// Input cost `phi_u(u)`.
    pub fn phi_u(&self, u: &Mat<f64>) -> f64 {
        assert_eq!(u.nrows(), self.m, "phi_u: dimension mismatch");
        let qu = &self.quad_u * u;
        linalg::dot(u, &qu) + linalg::dot(&self.lin_u, u)
    }

    /// Output cost `phi_y(y)`.
    pub fn phi_y(&self, y: &Mat<f64>) -> f64 {
        assert_eq!(y.nrows(), self.p, "phi_y: dimension mismatch");
        let qy = &self.quad_y * y;
        linalg::dot(y, &qy) + linalg::dot(&self.lin_y, y)
    }

    /// Complete cost `phi(u, y)`.
    pub fn phi(&self, u: &Mat<f64>, y: &Mat<f64>) -> f64 {
        self.phi_u(u) + self.phi_y(y)
    }

    /// Gradient `∇phi_u(u) = 2 quad_u u + lin_u`.
    pub fn grad_u(&self, u: &Mat<f64>) -> Mat<f64> {
        assert_eq!(u.nrows(), self.m, "grad_u: dimension mismatch");
        &(faer::scale(2.0) * &(&self.quad_u * u)) + &self.lin_u
    }

    /// Gradient `∇phi_y(y) = 2 quad_y y + lin_y`.
    pub fn grad_y(&self, y: &Mat<f64>) -> Mat<f64> {
        assert_eq!(y.nrows(), self.p, "grad_y: dimension mismatch");
        &(faer::scale(2.0) * &(&self.quad_y * y)) + &self.lin_y
    }
}

fn check_shape(
    mat: &Mat<f64>,
    rows: usize,
    cols: usize,
    label: &str,
) -> Result<(), OptimizerError> {
    if mat.nrows() != rows || mat.ncols() != cols {
        return Err(OptimizerError::DataValidation(format!(
            "{label} must be ({rows}, {cols}), got ({}, {})",
            mat.nrows(),
            mat.ncols()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn defaults_to_zero_cost() {
        let cost = Cost::new(&OptimizerConfig::default(), 2, 1).unwrap();
        let u = mat![[1.0], [2.0]];
        let y = mat![[3.0]];
        assert_eq!(cost.phi(&u, &y), 0.0);
        assert_eq!(linalg::norm2(&cost.grad_u(&u)), 0.0);
    }

    #[test]
    fn quadratic_cost_and_gradient_agree() {
        let config = OptimizerConfig {
            quad_u: Some(mat![[2.0, 0.0], [0.0, 1.0]]),
            lin_u: Some(mat![[1.0], [0.0]]),
            ..Default::default()
        };
        let cost = Cost::new(&config, 2, 1).unwrap();
        let u = mat![[1.0], [3.0]];
        // 2*1 + 9 + 1 = 12
        assert!((cost.phi_u(&u) - 12.0).abs() < 1e-12);
        let g = cost.grad_u(&u);
        assert!((g.read(0, 0) - 5.0).abs() < 1e-12);
        assert!((g.read(1, 0) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_psd_quadratic() {
        let config = OptimizerConfig {
            quad_u: Some(mat![[-1.0]]),
            ..Default::default()
        };
        assert!(Cost::new(&config, 1, 1).is_err());
    }

    #[test]
    fn rejects_wrong_shape() {
        let config = OptimizerConfig {
            lin_y: Some(mat![[1.0], [1.0]]),
            ..Default::default()
        };
        assert!(Cost::new(&config, 1, 1).is_err());
    }
}
