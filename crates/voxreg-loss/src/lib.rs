//! Differentiable losses for learning-based image registration.
//!
//! Image similarity metrics compare a fixed and a warped moving volume;
//! regularizers penalize the predicted displacement field. Both are built
//! directly from their `*Config` types or by name through [`LossRegistry`].

pub mod config;
pub mod metric;
pub mod reduction;
pub mod registry;
pub mod regularization;

pub use config::{LossConfig, LossParams};
pub use metric::{Metric, MetricExt, Negative};
pub use reduction::Reduction;
pub use registry::{ImageLossTerm, LossRegistry, RegularizerTerm};
pub use regularization::{Regularizer, RegularizerExt};
pub use voxreg_core::{InputRank, LossError, Result, EPS};
