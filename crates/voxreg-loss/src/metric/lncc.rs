//! Local Normalized Cross-Correlation metric implementation.

use burn::config::Config;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxreg_core::filter::separable_filter;
use voxreg_core::kernel::{Kernel1d, KernelType};
use voxreg_core::volume::{check_same_shape, sample_mean};
use voxreg_core::EPS;
use voxreg_core::Result as LossResult;

use super::negative::Negative;
use super::trait_::Metric;
use crate::config::LossParams;
use crate::reduction::Reduction;

/// Configuration for [`LocalNormalizedCrossCorrelation`].
#[derive(Config, Debug)]
pub struct LocalNormalizedCrossCorrelationConfig {
    /// Window length along each spatial axis.
    #[config(default = "9")]
    pub kernel_size: usize,
    /// Window shape: `rectangular`, `triangular` or `gaussian`.
    #[config(default = "default_kernel_type()")]
    pub kernel_type: String,
    /// Batch reduction.
    #[config(default = "Reduction::Sum")]
    pub reduction: Reduction,
}

fn default_kernel_type() -> String {
    KernelType::Rectangular.as_str().to_string()
}

impl LocalNormalizedCrossCorrelationConfig {
    /// Build from registry parameters `kernel_size`, `kernel_type`, `reduction`.
    pub fn from_params(params: &LossParams) -> LossResult<Self> {
        params.ensure_only("lncc", &["kernel_size", "kernel_type", "reduction"])?;
        let mut config = Self::new();
        if let Some(kernel_size) = params.usize("kernel_size")? {
            config = config.with_kernel_size(kernel_size);
        }
        if let Some(kernel_type) = params.string("kernel_type")? {
            config = config.with_kernel_type(kernel_type);
        }
        if let Some(reduction) = params.reduction()? {
            config = config.with_reduction(reduction);
        }
        Ok(config)
    }

    /// Parse the kernel type and build the window.
    ///
    /// # Errors
    /// `InvalidConfiguration` for an unknown kernel type, `InvalidArgument`
    /// for a size the kernel shape cannot take.
    pub fn init(&self) -> LossResult<LocalNormalizedCrossCorrelation> {
        let kernel_type: KernelType = self.kernel_type.parse()?;
        let kernel = kernel_type.build(self.kernel_size)?;
        let kernel_volume = kernel.volume(3);

        tracing::debug!(
            kernel_size = self.kernel_size,
            kernel_type = %kernel_type,
            kernel_volume,
            "built local normalized cross correlation"
        );

        Ok(LocalNormalizedCrossCorrelation {
            kernel_type,
            kernel,
            kernel_volume,
            reduction: self.reduction,
        })
    }

    /// Build the sign-reverted loss.
    pub fn init_loss(&self) -> LossResult<LocalNormalizedCrossCorrelationLoss> {
        Ok(Negative::new(self.init()?).with_name("LocalNormalizedCrossCorrelationLoss"))
    }
}

/// Squared normalized cross-correlation over sliding windows.
///
/// With windowed sums `S[.]` from the separable filter and `kv` the total
/// window weight:
///
/// ```text
/// cross = S[tp] - S[p] S[t] / kv
/// t_var = S[t²] - S[t]² / kv
/// p_var = S[p²] - S[p]² / kv
/// ncc   = (cross² + eps) / (t_var p_var + eps)
/// ```
///
/// averaged over all non-batch positions. Windows are zero padded at the
/// boundary. Values lie in `[0, 1]` up to `eps`; higher is more similar.
#[derive(Debug, Clone)]
pub struct LocalNormalizedCrossCorrelation {
    kernel_type: KernelType,
    kernel: Kernel1d,
    kernel_volume: f64,
    reduction: Reduction,
}

/// [`LocalNormalizedCrossCorrelation`] with reverted sign.
pub type LocalNormalizedCrossCorrelationLoss = Negative<LocalNormalizedCrossCorrelation>;

impl LocalNormalizedCrossCorrelation {
    pub fn kernel_type(&self) -> KernelType {
        self.kernel_type
    }

    pub fn kernel(&self) -> &Kernel1d {
        &self.kernel
    }

    /// Total window weight `sum(kernel)^3`.
    pub fn kernel_volume(&self) -> f64 {
        self.kernel_volume
    }
}

impl<B: Backend> Metric<B> for LocalNormalizedCrossCorrelation {
    fn call(&self, y_true: Tensor<B, 5>, y_pred: Tensor<B, 5>) -> LossResult<Tensor<B, 1>> {
        check_same_shape(&y_true, &y_pred)?;
        let [batch, d1, d2, d3, ch] = y_true.dims();

        if [d1, d2, d3].iter().any(|&d| d < self.kernel.len()) {
            tracing::warn!(
                shape = ?[d1, d2, d3],
                kernel_size = self.kernel.len(),
                "spatial axis shorter than the lncc window"
            );
        }

        // One filter pass over [t, p, t², p², tp] stacked on the channel axis.
        let t2 = y_true.clone() * y_true.clone();
        let p2 = y_pred.clone() * y_pred.clone();
        let tp = y_true.clone() * y_pred.clone();
        let stacked = Tensor::cat(vec![y_true, y_pred, t2, p2, tp], 4);
        let sums = separable_filter(stacked, &self.kernel);

        let channel = |i: usize| sums.clone().slice([0..batch, 0..d1, 0..d2, 0..d3, i * ch..(i + 1) * ch]);
        let t_sum = channel(0);
        let p_sum = channel(1);
        let t2_sum = channel(2);
        let p2_sum = channel(3);
        let tp_sum = channel(4);

        let t_avg = t_sum.clone().div_scalar(self.kernel_volume);
        let p_avg = p_sum.clone().div_scalar(self.kernel_volume);

        let cross = tp_sum - p_avg.clone() * t_sum.clone();
        let t_var = t2_sum - t_avg * t_sum;
        let p_var = p2_sum - p_avg * p_sum;

        let ncc = (cross.clone() * cross).add_scalar(EPS) / (t_var * p_var).add_scalar(EPS);

        Ok(sample_mean(ncc))
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn name(&self) -> &'static str {
        "LocalNormalizedCrossCorrelation"
    }
}
