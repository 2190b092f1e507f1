use burn::tensor::{Distribution, Tensor, TensorData};
use burn_ndarray::NdArray;
use voxreg_loss::regularization::{
    BendingEnergy, BendingEnergyConfig, GradientNorm, GradientNormConfig, Regularizer, RegularizerExt,
};
use voxreg_loss::{LossError, Reduction};

type B = NdArray<f32>;

/// Field of shape `[batch, n, n, n, 3]` with `f(x, y, z, channel)` per voxel.
fn field(batch: usize, n: usize, f: impl Fn(usize, usize, usize, usize) -> f32) -> Tensor<B, 5> {
    let mut data = Vec::with_capacity(batch * n * n * n * 3);
    for _ in 0..batch {
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    for c in 0..3 {
                        data.push(f(x, y, z, c));
                    }
                }
            }
        }
    }
    Tensor::from_data(TensorData::new(data, [batch, n, n, n, 3]), &Default::default())
}

fn values(tensor: Tensor<B, 1>) -> Vec<f32> {
    tensor.into_data().to_vec::<f32>().unwrap()
}

fn assert_close(actual: &[f32], expected: f32) {
    for v in actual {
        assert!((v - expected).abs() < 1e-5, "expected {}, got {}", expected, v);
    }
}

#[test]
fn test_constant_field_has_zero_penalty() {
    let constant = field(2, 6, |_, _, _, c| c as f32 + 0.5);

    assert_close(&values(GradientNorm::default().score(constant.clone()).unwrap()), 0.0);
    let l1 = GradientNormConfig::new().with_l1(true).init();
    assert_close(&values(l1.score(constant.clone()).unwrap()), 0.0);
    assert_close(&values(BendingEnergy::default().score(constant).unwrap()), 0.0);
}

#[test]
fn test_linear_field() {
    // Only the first channel varies, with unit slope along x.
    let linear = field(2, 6, |x, _, _, c| if c == 0 { x as f32 } else { 0.0 });

    // One of three channels has |fx| = 1 everywhere.
    assert_close(&values(GradientNorm::default().score(linear.clone()).unwrap()), 1.0 / 3.0);
    let l1 = GradientNormConfig::new().with_l1(true).init();
    assert_close(&values(l1.score(linear.clone()).unwrap()), 1.0 / 3.0);

    assert_close(&values(BendingEnergy::default().score(linear).unwrap()), 0.0);
}

#[test]
fn test_gradient_norm_l1_vs_l2() {
    // fx = 2 on channel 0: l2 gives 4 / 3, l1 gives 2 / 3.
    let steep = field(1, 5, |x, _, _, c| if c == 0 { 2.0 * x as f32 } else { 0.0 });
    assert_close(&values(GradientNorm::default().score(steep.clone()).unwrap()), 4.0 / 3.0);
    let l1 = GradientNormConfig::new().with_l1(true).init();
    assert_close(&values(l1.score(steep).unwrap()), 2.0 / 3.0);
}

#[test]
fn test_quadratic_field_bending() {
    // f = x^2 on channel 0: chained central differences give fxx = 2.
    let quadratic = field(1, 7, |x, _, _, c| if c == 0 { (x * x) as f32 } else { 0.0 });
    assert_close(&values(BendingEnergy::default().score(quadratic).unwrap()), 4.0 / 3.0);

    // f = x * y on channel 1: fxy = 1, weighted twice.
    let saddle = field(1, 7, |x, y, _, c| if c == 1 { (x * y) as f32 } else { 0.0 });
    assert_close(&values(BendingEnergy::default().score(saddle).unwrap()), 2.0 / 3.0);
}

#[test]
fn test_reduction() {
    let device = Default::default();
    let random = Tensor::<B, 5>::random([3, 5, 5, 5, 3], Distribution::Uniform(-1.0, 1.0), &device);

    let per_sample = values(GradientNorm::default().score(random.clone()).unwrap());
    let sum: f32 = per_sample.iter().sum();
    let summed = GradientNorm::default().forward(random.clone()).unwrap().into_scalar();
    assert!((summed - sum).abs() < 1e-4 * sum.abs().max(1.0));

    let mean = GradientNormConfig::new().with_reduction(Reduction::Mean).init();
    let averaged = mean.forward(random).unwrap().into_scalar();
    assert!((averaged - sum / 3.0).abs() < 1e-4 * sum.abs().max(1.0));
}

#[test]
fn test_invalid_fields() {
    let device = Default::default();

    let rank4 = Tensor::<B, 4>::zeros([1, 5, 5, 5], &device);
    assert!(matches!(
        GradientNorm::default().score(rank4),
        Err(LossError::UnsupportedRank { actual: 4, .. })
    ));

    let two_channels = Tensor::<B, 5>::zeros([1, 5, 5, 5, 2], &device);
    assert!(matches!(
        GradientNorm::default().score(two_channels),
        Err(LossError::ShapeMismatch { .. })
    ));

    // Bending energy needs five voxels per axis.
    let small = Tensor::<B, 5>::zeros([1, 4, 6, 6, 3], &device);
    assert!(GradientNorm::default().score(small.clone()).is_ok());
    assert!(matches!(
        BendingEnergy::default().score(small),
        Err(LossError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_boxed_regularizer() {
    let boxed: Box<dyn Regularizer<B>> = Box::new(BendingEnergyConfig::new().init());
    assert_eq!(boxed.name(), "BendingEnergy");
    assert_eq!(boxed.reduction(), Reduction::Sum);
    let zeros = Tensor::<B, 5>::zeros([2, 5, 5, 5, 3], &Default::default());
    assert_eq!(boxed.forward(zeros).unwrap().into_scalar(), 0.0);
}
