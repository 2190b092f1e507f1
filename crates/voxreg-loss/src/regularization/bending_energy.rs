//! Bending energy regularization for displacement fields.
//!
//! Penalizes second-order spatial derivatives, encouraging deformations with
//! minimal curvature:
//!
//! R(u) = mean(u_xx² + u_yy² + u_zz² + 2 u_xy² + 2 u_xz² + 2 u_yz²)
//!
//! Second derivatives are chained central differences, so the result lives
//! on the field interior cropped by two voxels per side.

use burn::config::Config;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxreg_core::volume::sample_mean;
use voxreg_core::Result as LossResult;

use super::trait_::utils::{check_displacement, gradient_dx, gradient_dy, gradient_dz};
use super::trait_::Regularizer;
use crate::config::LossParams;
use crate::reduction::Reduction;

/// Configuration for [`BendingEnergy`].
#[derive(Config, Debug)]
pub struct BendingEnergyConfig {
    /// Batch reduction.
    #[config(default = "Reduction::Sum")]
    pub reduction: Reduction,
}

impl BendingEnergyConfig {
    /// Build from registry parameter `reduction`.
    pub fn from_params(params: &LossParams) -> LossResult<Self> {
        params.ensure_only("bending", &["reduction"])?;
        let mut config = Self::new();
        if let Some(reduction) = params.reduction()? {
            config = config.with_reduction(reduction);
        }
        Ok(config)
    }

    pub fn init(&self) -> BendingEnergy {
        tracing::debug!(reduction = %self.reduction, "built bending energy");
        BendingEnergy {
            reduction: self.reduction,
        }
    }
}

/// Second-order smoothness penalty.
#[derive(Debug, Clone, Default)]
pub struct BendingEnergy {
    reduction: Reduction,
}

fn square<B: Backend>(x: Tensor<B, 5>) -> Tensor<B, 5> {
    x.clone() * x
}

impl<B: Backend> Regularizer<B> for BendingEnergy {
    fn call(&self, displacement: Tensor<B, 5>) -> LossResult<Tensor<B, 1>> {
        check_displacement(&displacement, 5)?;

        let dfdx = gradient_dx(displacement.clone());
        let dfdy = gradient_dy(displacement.clone());
        let dfdz = gradient_dz(displacement);

        let fxx = gradient_dx(dfdx.clone());
        let fyy = gradient_dy(dfdy.clone());
        let fzz = gradient_dz(dfdz);
        let fxy = gradient_dy(dfdx.clone());
        let fyz = gradient_dz(dfdy);
        let fxz = gradient_dz(dfdx);

        let energy = square(fxx)
            + square(fyy)
            + square(fzz)
            + (square(fxy) + square(fxz) + square(fyz)).mul_scalar(2.0);
        Ok(sample_mean(energy))
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn name(&self) -> &'static str {
        "BendingEnergy"
    }
}
