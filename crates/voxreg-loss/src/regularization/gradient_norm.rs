//! Gradient norm regularization for displacement fields.
//!
//! Penalizes first-order spatial derivatives of the displacement field:
//!
//! R(u) = mean(|∂x u| + |∂y u| + |∂z u|)     (l1)
//!
//! R(u) = mean((∂x u)² + (∂y u)² + (∂z u)²)  (l2)
//!
//! with central differences on the interior of the field.

use burn::config::Config;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxreg_core::volume::sample_mean;
use voxreg_core::Result as LossResult;

use super::trait_::utils::{check_displacement, gradients};
use super::trait_::Regularizer;
use crate::config::LossParams;
use crate::reduction::Reduction;

/// Configuration for [`GradientNorm`].
#[derive(Config, Debug)]
pub struct GradientNormConfig {
    /// Absolute values instead of squares.
    #[config(default = "false")]
    pub l1: bool,
    /// Batch reduction.
    #[config(default = "Reduction::Sum")]
    pub reduction: Reduction,
}

impl GradientNormConfig {
    /// Build from registry parameters `l1`, `reduction`.
    pub fn from_params(params: &LossParams) -> LossResult<Self> {
        params.ensure_only("gradient", &["l1", "reduction"])?;
        let mut config = Self::new();
        if let Some(l1) = params.bool("l1")? {
            config = config.with_l1(l1);
        }
        if let Some(reduction) = params.reduction()? {
            config = config.with_reduction(reduction);
        }
        Ok(config)
    }

    pub fn init(&self) -> GradientNorm {
        tracing::debug!(l1 = self.l1, reduction = %self.reduction, "built gradient norm");
        GradientNorm {
            l1: self.l1,
            reduction: self.reduction,
        }
    }
}

/// First-order smoothness penalty.
#[derive(Debug, Clone, Default)]
pub struct GradientNorm {
    l1: bool,
    reduction: Reduction,
}

impl GradientNorm {
    pub fn l1(&self) -> bool {
        self.l1
    }
}

impl<B: Backend> Regularizer<B> for GradientNorm {
    fn call(&self, displacement: Tensor<B, 5>) -> LossResult<Tensor<B, 1>> {
        check_displacement(&displacement, 3)?;
        let (fx, fy, fz) = gradients(displacement);

        let norms = if self.l1 {
            fx.abs() + fy.abs() + fz.abs()
        } else {
            fx.clone() * fx + fy.clone() * fy + fz.clone() * fz
        };
        Ok(sample_mean(norms))
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn name(&self) -> &'static str {
        "GradientNorm"
    }
}
