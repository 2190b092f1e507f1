//! Volume shape normalization shared by every metric.
//!
//! Metrics compute on channel-last rank-5 tensors `[batch, d1, d2, d3, ch]`.
//! Callers may hand in rank-4 volumes with an implicit singleton channel, or
//! for the global metrics any rank at all; [`lift`] maps all of these onto
//! the rank-5 layout in one place.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use crate::error::{LossError, Result};

/// Input ranks a metric accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRank {
    /// `[batch, d1, d2, d3]` or `[batch, d1, d2, d3, ch]`; spatial structure is used.
    Spatial,
    /// Any rank of at least the given value. Non-batch axes are only reduced
    /// over, so they may be flattened.
    AtLeast(usize),
}

impl InputRank {
    /// Whether a tensor of rank `rank` is accepted.
    pub fn accepts(&self, rank: usize) -> bool {
        match self {
            Self::Spatial => rank == 4 || rank == 5,
            Self::AtLeast(min) => rank >= (*min).max(1),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Spatial => "4 or 5".to_string(),
            Self::AtLeast(min) => format!("at least {}", (*min).max(1)),
        }
    }
}

/// Normalize a tensor to the channel-last rank-5 layout.
///
/// Rank 4 gains a trailing singleton channel, rank 5 is unchanged, any other
/// accepted rank becomes `[batch, rest, 1, 1, 1]`.
///
/// # Errors
/// `UnsupportedRank` if `rank` does not accept `D`.
pub fn lift<B: Backend, const D: usize>(tensor: Tensor<B, D>, rank: InputRank) -> Result<Tensor<B, 5>> {
    if !rank.accepts(D) {
        return Err(LossError::unsupported_rank(rank.describe(), D));
    }

    let dims = tensor.dims().to_vec();
    let lifted = match D {
        4 => tensor.reshape([dims[0], dims[1], dims[2], dims[3], 1]),
        5 => tensor.reshape([dims[0], dims[1], dims[2], dims[3], dims[4]]),
        _ => {
            let rest: usize = dims[1..].iter().product();
            tensor.reshape([dims[0], rest, 1, 1, 1])
        }
    };
    Ok(lifted)
}

/// Check shapes agree, then [`lift`] both tensors.
///
/// # Errors
/// `ShapeMismatch` if the shapes differ, `UnsupportedRank` as for [`lift`].
pub fn lift_pair<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
    rank: InputRank,
) -> Result<(Tensor<B, 5>, Tensor<B, 5>)> {
    let true_dims = y_true.dims();
    let pred_dims = y_pred.dims();
    if true_dims != pred_dims {
        return Err(LossError::shape_mismatch(&true_dims, &pred_dims));
    }
    Ok((lift(y_true, rank)?, lift(y_pred, rank)?))
}

/// Check two rank-5 tensors share a shape.
pub fn check_same_shape<B: Backend>(y_true: &Tensor<B, 5>, y_pred: &Tensor<B, 5>) -> Result<()> {
    let true_dims = y_true.dims();
    let pred_dims = y_pred.dims();
    if true_dims != pred_dims {
        return Err(LossError::shape_mismatch(&true_dims, &pred_dims));
    }
    Ok(())
}

/// Flatten everything but the batch axis: `[batch, d1 * d2 * d3 * ch]`.
pub fn flatten_samples<B: Backend>(volume: Tensor<B, 5>) -> Tensor<B, 2> {
    let [batch, d1, d2, d3, ch] = volume.dims();
    volume.reshape([batch, d1 * d2 * d3 * ch])
}

/// Per-sample mean over every non-batch position, shape `[batch]`.
pub fn sample_mean<B: Backend>(volume: Tensor<B, 5>) -> Tensor<B, 1> {
    let batch = volume.dims()[0];
    flatten_samples(volume).mean_dim(1).reshape([batch])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_lift_rank4_adds_channel() {
        let device = Default::default();
        let t = Tensor::<B, 4>::zeros([2, 3, 4, 5], &device);
        let lifted = lift(t, InputRank::Spatial).unwrap();
        assert_eq!(lifted.dims(), [2, 3, 4, 5, 1]);
    }

    #[test]
    fn test_lift_rank5_unchanged() {
        let device = Default::default();
        let t = Tensor::<B, 5>::zeros([2, 3, 4, 5, 2], &device);
        let lifted = lift(t, InputRank::Spatial).unwrap();
        assert_eq!(lifted.dims(), [2, 3, 4, 5, 2]);
    }

    #[test]
    fn test_spatial_rejects_rank3() {
        let device = Default::default();
        let t = Tensor::<B, 3>::zeros([2, 3, 4], &device);
        let err = lift(t, InputRank::Spatial).unwrap_err();
        assert_eq!(
            err,
            LossError::UnsupportedRank {
                expected: "4 or 5".to_string(),
                actual: 3
            }
        );
    }

    #[test]
    fn test_at_least_flattens() {
        let device = Default::default();
        let t = Tensor::<B, 2>::zeros([3, 7], &device);
        assert_eq!(lift(t, InputRank::AtLeast(2)).unwrap().dims(), [3, 7, 1, 1, 1]);

        let t = Tensor::<B, 1>::zeros([3], &device);
        assert_eq!(lift(t, InputRank::AtLeast(1)).unwrap().dims(), [3, 1, 1, 1, 1]);

        let t = Tensor::<B, 6>::zeros([2, 2, 2, 2, 2, 3], &device);
        assert_eq!(lift(t, InputRank::AtLeast(2)).unwrap().dims(), [2, 48, 1, 1, 1]);
    }

    #[test]
    fn test_at_least_rejects_low_rank() {
        let device = Default::default();
        let t = Tensor::<B, 1>::zeros([3], &device);
        assert!(matches!(
            lift(t, InputRank::AtLeast(2)),
            Err(LossError::UnsupportedRank { actual: 1, .. })
        ));
    }

    #[test]
    fn test_lift_pair_shape_mismatch() {
        let device = Default::default();
        let a = Tensor::<B, 4>::zeros([1, 4, 4, 4], &device);
        let b = Tensor::<B, 4>::zeros([1, 4, 4, 3], &device);
        let err = lift_pair(a, b, InputRank::Spatial).unwrap_err();
        assert_eq!(err, LossError::shape_mismatch(&[1, 4, 4, 4], &[1, 4, 4, 3]));
    }

    #[test]
    fn test_sample_mean() {
        let device = Default::default();
        let t = Tensor::<B, 5>::ones([2, 2, 2, 2, 1], &device);
        let mean = sample_mean(t).into_data().to_vec::<f32>().unwrap();
        assert_eq!(mean, vec![1.0, 1.0]);
    }
}
