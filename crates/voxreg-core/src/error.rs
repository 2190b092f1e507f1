//! Error types for loss construction and evaluation.
//!
//! Configuration problems surface when a kernel, metric or registry entry is
//! built. Shape problems surface when a metric is called. Numerical
//! degeneracy is never an error: it is absorbed by [`crate::EPS`].

use thiserror::Error;

/// Main error type for kernels, filters and losses.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LossError {
    /// An argument is outside its valid domain (non-positive size, sigma, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration (unknown kernel type, unknown loss name, ...).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Tensor rank outside the set a metric accepts.
    #[error("Unsupported rank: expected {expected}, got {actual}")]
    UnsupportedRank {
        expected: String,
        actual: usize,
    },

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// Result type for voxreg operations.
pub type Result<T> = std::result::Result<T, LossError>;

impl LossError {
    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an unsupported rank error.
    pub fn unsupported_rank(expected: impl Into<String>, actual: usize) -> Self {
        Self::UnsupportedRank {
            expected: expected.into(),
            actual,
        }
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Whether this error was raised while building something, as opposed to calling it.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::InvalidConfiguration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LossError::invalid_configuration("unknown kernel");
        assert!(matches!(err, LossError::InvalidConfiguration(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = LossError::invalid_argument("kernel size must be positive");
        assert_eq!(err.to_string(), "Invalid argument: kernel size must be positive");
    }

    #[test]
    fn test_unsupported_rank() {
        let err = LossError::unsupported_rank("4 or 5", 3);
        assert_eq!(err.to_string(), "Unsupported rank: expected 4 or 5, got 3");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_shape_mismatch() {
        let err = LossError::shape_mismatch(&[2, 8, 8, 8, 1], &[2, 8, 8, 4, 1]);
        let err_str = err.to_string();
        assert!(err_str.contains("expected"));
        assert!(err_str.contains("got"));
    }
}
