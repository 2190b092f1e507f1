use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use burn::tensor::module::conv1d;
use burn::tensor::ops::ConvOptions;

use crate::error::{LossError, Result};
use crate::kernel::Kernel1d;

/// Separable N-D filter.
///
/// Convolves a tensor with the same 1-D kernel along each configured axis in
/// turn. The result equals a single convolution with the outer product of the
/// kernel over those axes, without ever building the N-D kernel.
///
/// Boundaries are zero padded so every axis keeps its length. Padding follows
/// the "same" convention: `(k - 1) / 2` zeros before and the rest after, which
/// also keeps even-length kernels shape preserving.
#[derive(Debug, Clone)]
pub struct SeparableFilter {
    kernel: Kernel1d,
    axes: Vec<usize>,
}

impl SeparableFilter {
    /// Filter the three spatial axes of a `[batch, d1, d2, d3, channels]` volume.
    pub fn new(kernel: Kernel1d) -> Self {
        Self {
            kernel,
            axes: vec![1, 2, 3],
        }
    }

    /// Filter an explicit set of axes instead.
    pub fn with_axes(mut self, axes: Vec<usize>) -> Self {
        self.axes = axes;
        self
    }

    pub fn kernel(&self) -> &Kernel1d {
        &self.kernel
    }

    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    /// Apply the filter.
    ///
    /// # Errors
    /// `InvalidArgument` if an axis is the batch axis or is out of range for `D`.
    pub fn apply<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Result<Tensor<B, D>> {
        for &axis in &self.axes {
            if axis == 0 || axis >= D {
                return Err(LossError::invalid_argument(format!(
                    "cannot filter axis {} of a rank-{} tensor (batch axis is 0)",
                    axis, D
                )));
            }
        }

        tracing::trace!(
            shape = ?input.dims(),
            axes = ?self.axes,
            taps = self.kernel.len(),
            "separable filter"
        );

        Ok(filter_axes(input, &self.kernel, &self.axes))
    }
}

/// Filter the three spatial axes of a `[batch, d1, d2, d3, channels]` volume.
pub fn separable_filter<B: Backend>(volume: Tensor<B, 5>, kernel: &Kernel1d) -> Tensor<B, 5> {
    filter_axes(volume, kernel, &[1, 2, 3])
}

/// Convolve along each of `axes` in turn. Axes are assumed valid for `D`.
fn filter_axes<B: Backend, const D: usize>(
    input: Tensor<B, D>,
    kernel: &Kernel1d,
    axes: &[usize],
) -> Tensor<B, D> {
    let weights = kernel.to_tensor::<B>(&input.device());
    axes.iter()
        .fold(input, |data, &axis| convolve_1d(data, weights.clone(), axis))
}

/// Convolve along a single axis with same-size output.
fn convolve_1d<B: Backend, const D: usize>(
    input: Tensor<B, D>,
    kernel: Tensor<B, 1>,
    axis: usize,
) -> Tensor<B, D> {
    let last = D - 1;

    // 1. Move the target axis last
    let moved = if axis == last {
        input
    } else {
        input.swap_dims(axis, last)
    };
    let dims = moved.dims();
    let length = dims[last];
    let rows: usize = dims[..last].iter().product();
    if rows == 0 || length == 0 {
        return restore(moved, axis, last);
    }

    // 2. Flatten every other axis into the conv batch: [rows, 1, length]
    let taps = kernel.dims()[0];
    let before = (taps - 1) / 2;
    let after = taps - 1 - before;
    let padded = pad_last(moved.reshape([rows, 1, length]), before, after);

    let options = ConvOptions::new([1], [0], [1], 1);
    let filtered = conv1d(padded, kernel.reshape([1, 1, taps]), None, options);

    // 3. Back to the original layout
    restore(filtered.reshape(dims), axis, last)
}

fn restore<B: Backend, const D: usize>(tensor: Tensor<B, D>, axis: usize, last: usize) -> Tensor<B, D> {
    if axis == last {
        tensor
    } else {
        tensor.swap_dims(axis, last)
    }
}

fn pad_last<B: Backend>(tensor: Tensor<B, 3>, before: usize, after: usize) -> Tensor<B, 3> {
    if before == 0 && after == 0 {
        return tensor;
    }
    let [rows, channels, _] = tensor.dims();
    let device = tensor.device();

    let mut parts = Vec::with_capacity(3);
    if before > 0 {
        parts.push(Tensor::zeros([rows, channels, before], &device));
    }
    parts.push(tensor);
    if after > 0 {
        parts.push(Tensor::zeros([rows, channels, after], &device));
    }
    Tensor::cat(parts, 2)
}
