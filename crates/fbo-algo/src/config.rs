//! Optimizer configuration surface.

use faer::Mat;

use crate::OptimizerError;

/// Recognized optimizer options.
///
/// Cost coefficients default to zero when omitted; `beta` defaults to
/// `alpha`; the proximal deviation weights default to zero (no proximal
/// term). Which hyperparameters are required depends on the variant:
/// gradient-step variants need `alpha`, proximal variants need `rho`.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Display label; defaults to the variant name.
    pub name: Option<String>,
    /// Input cost quadratic, `(m, m)`, symmetric PSD.
    pub quad_u: Option<Mat<f64>>,
    /// Input cost linear term, `(m, 1)`.
    pub lin_u: Option<Mat<f64>>,
    /// Output cost quadratic, `(p, p)`, symmetric PSD.
    pub quad_y: Option<Mat<f64>>,
    /// Output cost linear term, `(p, 1)`.
    pub lin_y: Option<Mat<f64>>,
    /// Primal gradient learning rate.
    pub alpha: Option<f64>,
    /// Dual ascent learning rate; defaults to `alpha`.
    pub beta: Option<f64>,
    /// Coupling rate for proximal variants.
    pub rho: Option<f64>,
    /// Proximal deviation weight on `u`.
    pub gamma_u: f64,
    /// Proximal deviation weight on `z` (map-dualizing proximal variant).
    pub gamma_z: f64,
    /// Whether the input-side QP includes the Jacobian-coupling
    /// augmentation terms.
    pub centralized: bool,
}

impl OptimizerConfig {
    /// Display label, falling back to the variant name.
    pub(crate) fn label(&self, variant: &str) -> String {
        self.name.clone().unwrap_or_else(|| variant.to_string())
    }

    /// `(alpha, beta)` for gradient-step variants; `alpha` is required and
    /// `beta` falls back to it.
    pub(crate) fn gradient_rates(&self) -> Result<(f64, f64), OptimizerError> {
        let alpha = self.alpha.ok_or_else(|| {
            OptimizerError::DataValidation(
                "primal learning rate alpha must be set for gradient-step variants".into(),
            )
        })?;
        Ok((alpha, self.beta.unwrap_or(alpha)))
    }

    /// `rho` for proximal variants; required.
    pub(crate) fn proximal_rho(&self) -> Result<f64, OptimizerError> {
        self.rho.ok_or_else(|| {
            OptimizerError::DataValidation(
                "coupling rate rho must be set for proximal variants".into(),
            )
        })
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            name: None,
            quad_u: None,
            lin_u: None,
            quad_y: None,
            lin_y: None,
            alpha: None,
            beta: None,
            rho: None,
            gamma_u: 0.0,
            gamma_z: 0.0,
            centralized: true,
        }
    }
}
