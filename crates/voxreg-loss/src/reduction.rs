//! Reduction of per-sample scores across a batch.

use std::fmt;
use std::str::FromStr;

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use voxreg_core::{LossError, Result};

/// How per-sample scores combine across the batch axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Sum over the batch, shape `[1]`.
    #[default]
    Sum,
    /// Unweighted average over the batch, shape `[1]`.
    Mean,
    /// One score per sample, shape `[batch]`.
    None,
}

impl Reduction {
    /// Reduce per-sample scores `[batch]`.
    pub fn apply<B: Backend>(self, scores: Tensor<B, 1>) -> Tensor<B, 1> {
        match self {
            Self::Sum => scores.sum(),
            Self::Mean => scores.mean(),
            Self::None => scores,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::None => "none",
        }
    }
}

impl FromStr for Reduction {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(Self::Sum),
            // "auto" averages over the batch.
            "mean" | "auto" => Ok(Self::Mean),
            "none" => Ok(Self::None),
            other => Err(LossError::invalid_configuration(format!(
                "unknown reduction {:?}, expected one of sum, mean, none",
                other
            ))),
        }
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
