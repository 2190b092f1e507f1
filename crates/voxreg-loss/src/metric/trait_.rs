//! Metric trait for paired-volume similarity measures.
//!
//! This module defines the call contract shared by every similarity metric
//! and by the losses derived from them.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxreg_core::volume::{lift_pair, InputRank};
use voxreg_core::Result;

use crate::reduction::Reduction;

/// Metric trait for measuring similarity between a reference and a prediction.
///
/// Raw metrics report "higher is more similar"; wrap one in
/// [`Negative`](super::Negative) to minimize it.
///
/// The trait is object safe so that a registry can hand out
/// `Box<dyn Metric<B>>`. Rank handling and batch reduction live in
/// [`MetricExt`].
///
/// # Type Parameters
/// * `B` - The tensor backend
pub trait Metric<B: Backend> {
    /// Per-sample scores for channel-last volumes.
    ///
    /// # Arguments
    /// * `y_true` - Reference volume `[batch, d1, d2, d3, ch]`
    /// * `y_pred` - Predicted volume, same shape as `y_true`
    ///
    /// # Returns
    /// Tensor of shape `[batch]`
    fn call(&self, y_true: Tensor<B, 5>, y_pred: Tensor<B, 5>) -> Result<Tensor<B, 1>>;

    /// Input ranks accepted by [`MetricExt::score`].
    fn input_rank(&self) -> InputRank {
        InputRank::Spatial
    }

    /// Batch reduction applied by [`MetricExt::forward`].
    fn reduction(&self) -> Reduction;

    /// Get the name of this metric.
    fn name(&self) -> &'static str;
}

impl<B: Backend, M: Metric<B> + ?Sized> Metric<B> for Box<M> {
    fn call(&self, y_true: Tensor<B, 5>, y_pred: Tensor<B, 5>) -> Result<Tensor<B, 1>> {
        (**self).call(y_true, y_pred)
    }

    fn input_rank(&self) -> InputRank {
        (**self).input_rank()
    }

    fn reduction(&self) -> Reduction {
        (**self).reduction()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Rank-generic entry points, available on every [`Metric`] including `dyn Metric`.
pub trait MetricExt<B: Backend>: Metric<B> {
    /// Per-sample scores for tensors of any accepted rank.
    ///
    /// Rank-4 volumes are treated as having a trailing singleton channel.
    ///
    /// # Errors
    /// `ShapeMismatch` if the shapes differ, `UnsupportedRank` if `D` is not accepted.
    fn score<const D: usize>(&self, y_true: Tensor<B, D>, y_pred: Tensor<B, D>) -> Result<Tensor<B, 1>> {
        let (y_true, y_pred) = lift_pair(y_true, y_pred, self.input_rank())?;
        tracing::trace!(metric = self.name(), shape = ?y_true.dims(), "metric call");
        self.call(y_true, y_pred)
    }

    /// Scores reduced with [`Metric::reduction`].
    fn forward<const D: usize>(&self, y_true: Tensor<B, D>, y_pred: Tensor<B, D>) -> Result<Tensor<B, 1>> {
        Ok(self.reduction().apply(self.score(y_true, y_pred)?))
    }
}

impl<B: Backend, M: Metric<B> + ?Sized> MetricExt<B> for M {}
