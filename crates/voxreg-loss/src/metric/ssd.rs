//! Sum of Squared Differences metric implementation.

use burn::config::Config;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxreg_core::volume::{check_same_shape, sample_mean, InputRank};
use voxreg_core::Result as LossResult;

use super::trait_::Metric;
use crate::config::LossParams;
use crate::reduction::Reduction;

/// Configuration for [`SumSquaredDifference`].
#[derive(Config, Debug)]
pub struct SumSquaredDifferenceConfig {
    /// Batch reduction.
    #[config(default = "Reduction::Sum")]
    pub reduction: Reduction,
}

impl SumSquaredDifferenceConfig {
    /// Build from registry parameter `reduction`.
    pub fn from_params(params: &LossParams) -> LossResult<Self> {
        params.ensure_only("ssd", &["reduction"])?;
        let mut config = Self::new();
        if let Some(reduction) = params.reduction()? {
            config = config.with_reduction(reduction);
        }
        Ok(config)
    }

    pub fn init(&self) -> SumSquaredDifference {
        tracing::debug!(reduction = %self.reduction, "built sum of squared differences");
        SumSquaredDifference {
            reduction: self.reduction,
        }
    }
}

/// Mean squared intensity difference per sample.
///
/// Already a loss: lower is more similar, so it is used without
/// [`Negative`](super::Negative).
#[derive(Debug, Clone)]
pub struct SumSquaredDifference {
    reduction: Reduction,
}

impl Default for SumSquaredDifference {
    fn default() -> Self {
        Self {
            reduction: Reduction::Sum,
        }
    }
}

impl<B: Backend> Metric<B> for SumSquaredDifference {
    fn call(&self, y_true: Tensor<B, 5>, y_pred: Tensor<B, 5>) -> LossResult<Tensor<B, 1>> {
        check_same_shape(&y_true, &y_pred)?;
        let diff = y_true - y_pred;
        Ok(sample_mean(diff.clone() * diff))
    }

    fn input_rank(&self) -> InputRank {
        InputRank::AtLeast(1)
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn name(&self) -> &'static str {
        "SumSquaredDifference"
    }
}
