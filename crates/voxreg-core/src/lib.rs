//! Numerical building blocks for registration losses.
//!
//! * [`kernel`]: 1-D window kernels (rectangular, triangular, gaussian, cauchy)
//! * [`filter`]: separable N-D windowed sums over batched volumes
//! * [`volume`]: rank normalization of `[batch, d1, d2, d3, (ch)]` inputs
//! * [`error`]: the shared error taxonomy

pub mod error;
pub mod filter;
pub mod kernel;
pub mod volume;

pub use error::{LossError, Result};
pub use filter::{separable_filter, SeparableFilter};
pub use kernel::{Kernel1d, KernelType};
pub use volume::InputRank;

/// Additive guard used in every division and logarithm of the metrics.
pub const EPS: f64 = 1e-7;
