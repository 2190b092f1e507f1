//! Regularizer trait definition.
//!
//! This module defines the call contract for deformation regularizers and the
//! finite-difference helpers they share.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxreg_core::Result;

use crate::reduction::Reduction;

/// Trait for deformation field regularizers.
///
/// Regularizers penalize non-smooth dense displacement fields. Like
/// [`Metric`](crate::metric::Metric) the trait is object safe; the
/// rank-generic entry points live in [`RegularizerExt`].
///
/// # Type Parameters
/// * `B` - The backend type
pub trait Regularizer<B: Backend> {
    /// Per-sample penalties.
    ///
    /// # Arguments
    /// * `displacement` - Field `[batch, d1, d2, d3, 3]`
    ///
    /// # Returns
    /// Tensor of shape `[batch]`
    fn call(&self, displacement: Tensor<B, 5>) -> Result<Tensor<B, 1>>;

    /// Batch reduction applied by [`RegularizerExt::forward`].
    fn reduction(&self) -> Reduction;

    /// Get the name of this regularizer.
    fn name(&self) -> &'static str;
}

impl<B: Backend, R: Regularizer<B> + ?Sized> Regularizer<B> for Box<R> {
    fn call(&self, displacement: Tensor<B, 5>) -> Result<Tensor<B, 1>> {
        (**self).call(displacement)
    }

    fn reduction(&self) -> Reduction {
        (**self).reduction()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Rank-generic entry points, available on every [`Regularizer`].
pub trait RegularizerExt<B: Backend>: Regularizer<B> {
    /// Per-sample penalties for a tensor of any rank.
    ///
    /// # Errors
    /// `UnsupportedRank` unless `D == 5`, plus whatever [`Regularizer::call`] reports.
    fn score<const D: usize>(&self, displacement: Tensor<B, D>) -> Result<Tensor<B, 1>> {
        let displacement = utils::lift_displacement(displacement)?;
        tracing::trace!(regularizer = self.name(), shape = ?displacement.dims(), "regularizer call");
        self.call(displacement)
    }

    /// Penalties reduced with [`Regularizer::reduction`].
    fn forward<const D: usize>(&self, displacement: Tensor<B, D>) -> Result<Tensor<B, 1>> {
        Ok(self.reduction().apply(self.score(displacement)?))
    }
}

impl<B: Backend, R: Regularizer<B> + ?Sized> RegularizerExt<B> for R {}

/// Utility functions for computing spatial gradients.
pub mod utils {
    use burn::tensor::backend::Backend;
    use burn::tensor::Tensor;
    use voxreg_core::{LossError, Result};

    /// Accept only channel-last rank-5 fields.
    pub fn lift_displacement<B: Backend, const D: usize>(field: Tensor<B, D>) -> Result<Tensor<B, 5>> {
        if D != 5 {
            return Err(LossError::unsupported_rank("5", D));
        }
        let dims = field.dims().to_vec();
        Ok(field.reshape([dims[0], dims[1], dims[2], dims[3], dims[4]]))
    }

    /// Check a field has three displacement channels and every spatial
    /// extent is at least `min_extent`.
    pub fn check_displacement<B: Backend>(field: &Tensor<B, 5>, min_extent: usize) -> Result<()> {
        let [batch, d1, d2, d3, ch] = field.dims();
        if ch != 3 || [d1, d2, d3].iter().any(|&d| d < min_extent) {
            let expected = [batch, d1.max(min_extent), d2.max(min_extent), d3.max(min_extent), 3];
            return Err(LossError::shape_mismatch(&expected, &[batch, d1, d2, d3, ch]));
        }
        Ok(())
    }

    /// Central difference along spatial axis `axis` (1, 2 or 3), cropped by
    /// one voxel on both sides of every spatial axis.
    ///
    /// Output shape `[batch, d1 - 2, d2 - 2, d3 - 2, ch]`; every spatial
    /// extent must be at least 3.
    pub fn central_difference<B: Backend>(field: Tensor<B, 5>, axis: usize) -> Tensor<B, 5> {
        let [b, d1, d2, d3, c] = field.dims();
        let mut ahead = [0..b, 1..d1 - 1, 1..d2 - 1, 1..d3 - 1, 0..c];
        let mut behind = ahead.clone();
        let extent = [b, d1, d2, d3, c][axis];
        ahead[axis] = 2..extent;
        behind[axis] = 0..extent - 2;

        (field.clone().slice(ahead) - field.slice(behind)).div_scalar(2.0)
    }

    pub fn gradient_dx<B: Backend>(field: Tensor<B, 5>) -> Tensor<B, 5> {
        central_difference(field, 1)
    }

    pub fn gradient_dy<B: Backend>(field: Tensor<B, 5>) -> Tensor<B, 5> {
        central_difference(field, 2)
    }

    pub fn gradient_dz<B: Backend>(field: Tensor<B, 5>) -> Tensor<B, 5> {
        central_difference(field, 3)
    }

    /// First derivatives `(fx, fy, fz)` on the interior.
    pub fn gradients<B: Backend>(field: Tensor<B, 5>) -> (Tensor<B, 5>, Tensor<B, 5>, Tensor<B, 5>) {
        (
            gradient_dx(field.clone()),
            gradient_dy(field.clone()),
            gradient_dz(field),
        )
    }
}
