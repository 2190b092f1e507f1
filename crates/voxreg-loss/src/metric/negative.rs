//! Sign adapter turning a similarity metric into a loss.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxreg_core::volume::InputRank;
use voxreg_core::Result;

use super::trait_::Metric;
use crate::reduction::Reduction;

/// Negates the per-sample scores of the wrapped metric.
///
/// Everything else (accepted ranks, reduction, hyperparameters) is the
/// wrapped metric's own.
#[derive(Debug, Clone)]
pub struct Negative<M> {
    inner: M,
    name: Option<&'static str>,
}

impl<M> Negative<M> {
    /// Wrap a metric. The name defaults to the wrapped metric's name.
    pub fn new(inner: M) -> Self {
        Self { inner, name: None }
    }

    /// Report `name` instead of the wrapped metric's name.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// The wrapped metric.
    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<B: Backend, M: Metric<B>> Metric<B> for Negative<M> {
    fn call(&self, y_true: Tensor<B, 5>, y_pred: Tensor<B, 5>) -> Result<Tensor<B, 1>> {
        Ok(self.inner.call(y_true, y_pred)?.neg())
    }

    fn input_rank(&self) -> InputRank {
        self.inner.input_rank()
    }

    fn reduction(&self) -> Reduction {
        self.inner.reduction()
    }

    fn name(&self) -> &'static str {
        self.name.unwrap_or_else(|| self.inner.name())
    }
}
