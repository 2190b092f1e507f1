//! Global Mutual Information metric implementation.

use burn::config::Config;
use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use voxreg_core::volume::check_same_shape;
use voxreg_core::{LossError, EPS};
use voxreg_core::Result as LossResult;

use super::negative::Negative;
use super::trait_::Metric;
use crate::config::LossParams;
use crate::reduction::Reduction;

/// Configuration for [`GlobalMutualInformation`].
#[derive(Config, Debug)]
pub struct GlobalMutualInformationConfig {
    /// Number of intensity bins in `[0, 1]`; the default is empirical.
    #[config(default = "23")]
    pub num_bins: usize,
    /// Parzen window width as a fraction of the bin spacing.
    #[config(default = "0.5")]
    pub sigma_ratio: f64,
    /// Batch reduction.
    #[config(default = "Reduction::Sum")]
    pub reduction: Reduction,
}

impl GlobalMutualInformationConfig {
    /// Build from registry parameters `num_bins`, `sigma_ratio`, `reduction`.
    pub fn from_params(params: &LossParams) -> LossResult<Self> {
        params.ensure_only("gmi", &["num_bins", "sigma_ratio", "reduction"])?;
        let mut config = Self::new();
        if let Some(num_bins) = params.usize("num_bins")? {
            config = config.with_num_bins(num_bins);
        }
        if let Some(sigma_ratio) = params.f64("sigma_ratio")? {
            config = config.with_sigma_ratio(sigma_ratio);
        }
        if let Some(reduction) = params.reduction()? {
            config = config.with_reduction(reduction);
        }
        Ok(config)
    }

    /// Validate and build the metric.
    ///
    /// # Errors
    /// `InvalidConfiguration` if `num_bins < 2` or `sigma_ratio` is not positive.
    pub fn init(&self) -> LossResult<GlobalMutualInformation> {
        if self.num_bins < 2 {
            return Err(LossError::invalid_configuration(format!(
                "num_bins must be at least 2, got {}",
                self.num_bins
            )));
        }
        if !(self.sigma_ratio.is_finite() && self.sigma_ratio > 0.0) {
            return Err(LossError::invalid_configuration(format!(
                "sigma_ratio must be positive, got {}",
                self.sigma_ratio
            )));
        }
        Ok(GlobalMutualInformation::build(
            self.num_bins,
            self.sigma_ratio,
            self.reduction,
        ))
    }

    /// Validate and build the sign-reverted loss.
    pub fn init_loss(&self) -> LossResult<GlobalMutualInformationLoss> {
        Ok(Negative::new(self.init()?).with_name("GlobalMutualInformationLoss"))
    }
}

/// Differentiable global mutual information via Parzen windowing.
///
/// Each voxel contributes a Gaussian-weighted, per-voxel normalized soft
/// assignment to every intensity bin; marginal and joint densities follow
/// from averaging those assignments, and
///
/// MI = sum_ab P(a, b) * ln(P(a, b) / (P(a) P(b)))
///
/// with [`EPS`] guarding both the ratio and the logarithm. Intensities are
/// clipped to `[0, 1]` first. Higher is more similar.
#[derive(Debug, Clone)]
pub struct GlobalMutualInformation {
    num_bins: usize,
    sigma_ratio: f64,
    bin_centers: Vec<f64>,
    preterm: f64,
    reduction: Reduction,
}

/// [`GlobalMutualInformation`] with reverted sign.
pub type GlobalMutualInformationLoss = Negative<GlobalMutualInformation>;

impl GlobalMutualInformation {
    fn build(num_bins: usize, sigma_ratio: f64, reduction: Reduction) -> Self {
        let step = 1.0 / (num_bins - 1) as f64;
        let bin_centers: Vec<f64> = (0..num_bins).map(|i| i as f64 * step).collect();

        // Mean spacing of adjacent centres, scaled.
        let spacing = bin_centers
            .windows(2)
            .map(|w| w[1] - w[0])
            .sum::<f64>()
            / (num_bins - 1) as f64;
        let sigma = spacing * sigma_ratio;
        let preterm = 1.0 / (2.0 * sigma * sigma);

        tracing::debug!(num_bins, sigma_ratio, sigma, "built global mutual information");

        Self {
            num_bins,
            sigma_ratio,
            bin_centers,
            preterm,
            reduction,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn sigma_ratio(&self) -> f64 {
        self.sigma_ratio
    }

    /// Bin centres, equally spaced in `[0, 1]`.
    pub fn bin_centers(&self) -> &[f64] {
        &self.bin_centers
    }

    /// Soft histogram weights `[batch, voxels, bins]`, each row summing to one.
    fn soft_histogram<B: Backend>(&self, values: Tensor<B, 3>, centers: Tensor<B, 3>) -> Tensor<B, 3> {
        let weights = (values - centers)
            .powf_scalar(2.0)
            .mul_scalar(-self.preterm)
            .exp();
        let totals = weights.clone().sum_dim(2);
        weights / totals
    }
}

impl Default for GlobalMutualInformation {
    fn default() -> Self {
        Self::build(23, 0.5, Reduction::Sum)
    }
}

impl<B: Backend> Metric<B> for GlobalMutualInformation {
    fn call(&self, y_true: Tensor<B, 5>, y_pred: Tensor<B, 5>) -> LossResult<Tensor<B, 1>> {
        check_same_shape(&y_true, &y_pred)?;
        let [batch, d1, d2, d3, ch] = y_true.dims();
        let voxels = d1 * d2 * d3 * ch;
        let device = y_true.device();

        // 1. Clip and flatten: [batch, voxels, 1]
        let y_true = y_true.clamp(0.0, 1.0).reshape([batch, voxels, 1]);
        let y_pred = y_pred.clamp(0.0, 1.0).reshape([batch, voxels, 1]);

        let centers = Tensor::<B, 3>::from_data(
            TensorData::new(self.bin_centers.clone(), [1, 1, self.num_bins]),
            &device,
        );

        // 2. Soft assignments: [batch, voxels, bins]
        let ia = self.soft_histogram(y_true, centers.clone());
        let ib = self.soft_histogram(y_pred, centers);

        // 3. Marginals: [batch, 1, bins]
        let pa = ia.clone().mean_dim(1);
        let pb = ib.clone().mean_dim(1);

        // 4. Joint and product of marginals: [batch, bins, bins]
        let pab = ia.swap_dims(1, 2).matmul(ib).div_scalar(voxels as f64);
        let papb = pa.swap_dims(1, 2).matmul(pb);

        // 5. MI = sum(P_ab * ln(P_ab / (P_a P_b)))
        let ratio = pab.clone().add_scalar(EPS) / papb.add_scalar(EPS);
        let mi = pab * ratio.add_scalar(EPS).log();

        Ok(mi.sum_dim(2).sum_dim(1).reshape([batch]))
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn name(&self) -> &'static str {
        "GlobalMutualInformation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricExt;
    use burn::tensor::Shape;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    fn ramp(batch: usize, size: usize) -> Tensor<B, 4> {
        let count = batch * size * size * size;
        let per_sample = size * size * size;
        let data: Vec<f32> = (0..count)
            .map(|x| (x % per_sample) as f32 / per_sample as f32)
            .collect();
        Tensor::from_data(
            TensorData::new(data, Shape::new([batch, size, size, size])),
            &Default::default(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = GlobalMutualInformationConfig::new();
        assert_eq!(config.num_bins, 23);
        assert_eq!(config.sigma_ratio, 0.5);
        assert_eq!(config.reduction, Reduction::Sum);
    }

    #[test]
    fn test_bin_centers() {
        let metric = GlobalMutualInformationConfig::new().with_num_bins(5).init().unwrap();
        assert_eq!(metric.bin_centers(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_invalid_config() {
        let err = GlobalMutualInformationConfig::new().with_num_bins(1).init().unwrap_err();
        assert!(matches!(err, LossError::InvalidConfiguration(_)));

        let err = GlobalMutualInformationConfig::new().with_sigma_ratio(0.0).init().unwrap_err();
        assert!(matches!(err, LossError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_mutual_information_identical() {
        let image = ramp(2, 6);
        let metric = GlobalMutualInformation::default();
        let scores = metric.score(image.clone(), image).unwrap();
        let values = scores.into_data().to_vec::<f32>().unwrap();

        assert_eq!(values.len(), 2);
        for v in values {
            assert!(v.is_finite());
            // MI(X, X) = H(X) > 0 for a non-constant image.
            assert!(v > 0.0);
        }
    }

    #[test]
    fn test_mutual_information_loss_is_negated() {
        let a = ramp(1, 5);
        let b = a.clone().mul_scalar(0.5);
        let metric = GlobalMutualInformationConfig::new().init().unwrap();
        let loss = GlobalMutualInformationConfig::new().init_loss().unwrap();

        let m = metric.score(a.clone(), b.clone()).unwrap().into_scalar();
        let l = loss.score(a, b).unwrap().into_scalar();
        assert_eq!(l, -m);
        assert_eq!(Metric::<B>::name(&loss), "GlobalMutualInformationLoss");
    }

    #[test]
    fn test_rejects_rank3() {
        let device = Default::default();
        let a = Tensor::<B, 3>::zeros([1, 4, 4], &device);
        let metric = GlobalMutualInformation::default();
        assert!(matches!(
            metric.score(a.clone(), a),
            Err(LossError::UnsupportedRank { actual: 3, .. })
        ));
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let device = Default::default();
        let a = Tensor::<B, 5>::zeros([1, 4, 4, 4, 1], &device);
        let b = Tensor::<B, 5>::zeros([1, 4, 4, 4, 2], &device);
        let metric = GlobalMutualInformation::default();
        assert!(matches!(metric.call(a, b), Err(LossError::ShapeMismatch { .. })));
    }
}
