//! Global Normalized Cross-Correlation metric implementation.

use burn::config::Config;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxreg_core::volume::{check_same_shape, flatten_samples, InputRank};
use voxreg_core::EPS;
use voxreg_core::Result as LossResult;

use super::negative::Negative;
use super::trait_::Metric;
use crate::config::LossParams;
use crate::reduction::Reduction;

/// Configuration for [`GlobalNormalizedCrossCorrelation`].
#[derive(Config, Debug)]
pub struct GlobalNormalizedCrossCorrelationConfig {
    /// Batch reduction.
    #[config(default = "Reduction::Mean")]
    pub reduction: Reduction,
}

impl GlobalNormalizedCrossCorrelationConfig {
    /// Build from registry parameter `reduction`.
    pub fn from_params(params: &LossParams) -> LossResult<Self> {
        params.ensure_only("gncc", &["reduction"])?;
        let mut config = Self::new();
        if let Some(reduction) = params.reduction()? {
            config = config.with_reduction(reduction);
        }
        Ok(config)
    }

    pub fn init(&self) -> GlobalNormalizedCrossCorrelation {
        tracing::debug!(reduction = %self.reduction, "built global normalized cross correlation");
        GlobalNormalizedCrossCorrelation {
            reduction: self.reduction,
        }
    }

    /// Build the sign-reverted loss.
    pub fn init_loss(&self) -> GlobalNormalizedCrossCorrelationLoss {
        Negative::new(self.init()).with_name("GlobalNormalizedCrossCorrelationLoss")
    }
}

/// Squared Pearson correlation over all non-batch elements of each sample.
///
/// `(|cov(p, t)|² + eps) / (var(p) var(t) + eps)` with population moments.
/// Accepts any rank of at least 2; spatial layout is irrelevant.
#[derive(Debug, Clone)]
pub struct GlobalNormalizedCrossCorrelation {
    reduction: Reduction,
}

/// [`GlobalNormalizedCrossCorrelation`] with reverted sign.
pub type GlobalNormalizedCrossCorrelationLoss = Negative<GlobalNormalizedCrossCorrelation>;

impl Default for GlobalNormalizedCrossCorrelation {
    fn default() -> Self {
        Self {
            reduction: Reduction::Mean,
        }
    }
}

impl<B: Backend> Metric<B> for GlobalNormalizedCrossCorrelation {
    fn call(&self, y_true: Tensor<B, 5>, y_pred: Tensor<B, 5>) -> LossResult<Tensor<B, 1>> {
        check_same_shape(&y_true, &y_pred)?;
        let batch = y_true.dims()[0];

        let t = flatten_samples(y_true);
        let p = flatten_samples(y_pred);

        let t_hat = t.clone() - t.mean_dim(1);
        let p_hat = p.clone() - p.mean_dim(1);

        let t_var = (t_hat.clone() * t_hat.clone()).mean_dim(1);
        let p_var = (p_hat.clone() * p_hat.clone()).mean_dim(1);
        let num = (p_hat * t_hat).mean_dim(1).abs();

        let ncc = (num.clone() * num).add_scalar(EPS) / (p_var * t_var).add_scalar(EPS);
        Ok(ncc.reshape([batch]))
    }

    fn input_rank(&self) -> InputRank {
        InputRank::AtLeast(2)
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn name(&self) -> &'static str {
        "GlobalNormalizedCrossCorrelation"
    }
}
