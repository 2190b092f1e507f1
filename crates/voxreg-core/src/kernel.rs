//! One-dimensional window kernels for local statistics.
//!
//! Size-based kernels (rectangular, triangular, gaussian-by-size) are raw
//! weights and are *not* normalized; consumers divide by [`Kernel1d::volume`].
//! Sigma-based kernels (gaussian-by-sigma, cauchy) sum to one.

use std::fmt;
use std::str::FromStr;

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;

use crate::error::{LossError, Result};

/// Immutable 1-D weighting kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel1d {
    weights: Vec<f64>,
}

impl Kernel1d {
    /// All-ones kernel of length `size`.
    pub fn rectangular(size: usize) -> Result<Self> {
        check_size(size)?;
        Ok(Self {
            weights: vec![1.0; size],
        })
    }

    /// Triangular kernel `w[i] = min(i + 1, size - i)`, e.g. `[1, 2, 3, 2, 1]` for size 5.
    ///
    /// `size` must be odd.
    pub fn triangular(size: usize) -> Result<Self> {
        check_size(size)?;
        if size % 2 == 0 {
            return Err(LossError::invalid_argument(format!(
                "triangular kernel size must be odd, got {}",
                size
            )));
        }
        let weights = (0..size).map(|i| (i + 1).min(size - i) as f64).collect();
        Ok(Self { weights })
    }

    /// Gaussian samples with mean `(size - 1) / 2` and sigma `size / 3`.
    pub fn gaussian_by_size(size: usize) -> Result<Self> {
        check_size(size)?;
        let mean = (size as f64 - 1.0) / 2.0;
        let sigma = size as f64 / 3.0;
        let two_sigma2 = 2.0 * sigma * sigma;
        let weights = (0..size)
            .map(|i| {
                let x = i as f64 - mean;
                (-x * x / two_sigma2).exp()
            })
            .collect();
        Ok(Self { weights })
    }

    /// Normalized Gaussian on `[-floor(3 sigma), floor(3 sigma)]`.
    pub fn gaussian_by_sigma(sigma: f64) -> Result<Self> {
        check_sigma(sigma)?;
        let weights = symmetric_support(sigma, 3.0)
            .map(|x| (-0.5 * x * x / (sigma * sigma)).exp())
            .collect();
        Ok(Self::normalized(weights))
    }

    /// Normalized Cauchy kernel on `[-floor(5 sigma), floor(5 sigma)]`.
    pub fn cauchy(sigma: f64) -> Result<Self> {
        check_sigma(sigma)?;
        let weights = symmetric_support(sigma, 5.0)
            .map(|x| 1.0 / ((x / sigma).powi(2) + 1.0))
            .collect();
        Ok(Self::normalized(weights))
    }

    fn normalized(mut weights: Vec<f64>) -> Self {
        let sum: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= sum;
        }
        Self { weights }
    }

    /// Kernel weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of taps.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Always false; kernels have at least one tap.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of the weights.
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Total mass of the `axes`-fold outer product of the kernel with itself.
    ///
    /// For three spatial axes this is the window weight `E[1]` used to turn
    /// windowed sums into windowed means.
    pub fn volume(&self, axes: usize) -> f64 {
        self.sum().powi(axes as i32)
    }

    /// Upload the weights as a rank-1 tensor.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 1> {
        Tensor::from_data(
            TensorData::new(self.weights.clone(), [self.weights.len()]),
            device,
        )
    }
}

fn check_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(LossError::invalid_argument("kernel size must be positive"));
    }
    Ok(())
}

fn check_sigma(sigma: f64) -> Result<()> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(LossError::invalid_argument(format!(
            "kernel sigma must be positive and finite, got {}",
            sigma
        )));
    }
    Ok(())
}

/// Integer offsets `-tail..=tail` with `tail = floor(factor * sigma)`, as floats.
fn symmetric_support(sigma: f64, factor: f64) -> impl Iterator<Item = f64> {
    let tail = (factor * sigma).floor() as i64;
    (-tail..=tail).map(|x| x as f64)
}

/// Window shapes selectable by name for local cross-correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelType {
    Rectangular,
    Triangular,
    /// Gaussian parametrized by its size, see [`Kernel1d::gaussian_by_size`].
    Gaussian,
}

impl KernelType {
    /// All identifiers accepted by [`FromStr`].
    pub const NAMES: [&'static str; 3] = ["rectangular", "triangular", "gaussian"];

    /// Build the kernel of this type with `size` taps.
    pub fn build(self, size: usize) -> Result<Kernel1d> {
        let kernel = match self {
            Self::Rectangular => Kernel1d::rectangular(size),
            Self::Triangular => Kernel1d::triangular(size),
            Self::Gaussian => Kernel1d::gaussian_by_size(size),
        }?;
        tracing::debug!(kernel_type = self.as_str(), size, sum = kernel.sum(), "built kernel");
        Ok(kernel)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rectangular => "rectangular",
            Self::Triangular => "triangular",
            Self::Gaussian => "gaussian",
        }
    }
}

impl FromStr for KernelType {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rectangular" => Ok(Self::Rectangular),
            "triangular" => Ok(Self::Triangular),
            "gaussian" => Ok(Self::Gaussian),
            other => Err(LossError::invalid_configuration(format!(
                "wrong kernel_type {:?}, feasible values are {:?}",
                other,
                Self::NAMES
            ))),
        }
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(got: &[f64], expected: &[f64]) {
        assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(expected) {
            assert!((g - e).abs() < 1e-9, "got {:?}, expected {:?}", got, expected);
        }
    }

    #[test]
    fn test_rectangular() {
        for size in [1, 3, 7, 11] {
            let k = Kernel1d::rectangular(size).unwrap();
            assert_eq!(k.len(), size);
            assert!(k.weights().iter().all(|&w| w == 1.0));
        }
    }

    #[test]
    fn test_triangular() {
        let k = Kernel1d::triangular(5).unwrap();
        assert_eq!(k.weights(), &[1.0, 2.0, 3.0, 2.0, 1.0]);

        for size in [3, 7, 9] {
            let k = Kernel1d::triangular(size).unwrap();
            assert_eq!(k.len(), size);
            assert_eq!(k.weights()[size / 2], (size / 2 + 1) as f64);
        }
    }

    #[test]
    fn test_triangular_even_size() {
        let err = Kernel1d::triangular(4).unwrap_err();
        assert!(matches!(err, LossError::InvalidArgument(_)));
    }

    #[test]
    fn test_gaussian_by_size() {
        for size in [3usize, 7, 11] {
            let mean = (size as f64 - 1.0) / 2.0;
            let sigma = size as f64 / 3.0;
            let expected: Vec<f64> = (0..size)
                .map(|i| (-(i as f64 - mean).powi(2) / (2.0 * sigma * sigma)).exp())
                .collect();
            let k = Kernel1d::gaussian_by_size(size).unwrap();
            assert_close(k.weights(), &expected);
            // Raw samples: the centre tap is exactly one.
            assert_eq!(k.weights()[size / 2], 1.0);
        }
    }

    #[test]
    fn test_gaussian_by_sigma() {
        for sigma in [1.0, 3.0, 2.2] {
            let tail = (sigma * 3.0) as i64;
            let raw: Vec<f64> = (-tail..=tail)
                .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
                .collect();
            let total: f64 = raw.iter().sum();
            let expected: Vec<f64> = raw.iter().map(|w| w / total).collect();

            let k = Kernel1d::gaussian_by_sigma(sigma).unwrap();
            assert_eq!(k.len(), 2 * tail as usize + 1);
            assert_close(k.weights(), &expected);
            assert!((k.sum() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cauchy() {
        for sigma in [1.0, 3.0, 2.2] {
            let tail = (sigma * 5.0) as i64;
            let raw: Vec<f64> = (-tail..=tail)
                .map(|x| 1.0 / ((x as f64 / sigma).powi(2) + 1.0))
                .collect();
            let total: f64 = raw.iter().sum();
            let expected: Vec<f64> = raw.iter().map(|w| w / total).collect();

            let k = Kernel1d::cauchy(sigma).unwrap();
            assert_eq!(k.len(), 2 * tail as usize + 1);
            assert_close(k.weights(), &expected);
            assert!((k.sum() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_size_one() {
        for k in [
            Kernel1d::rectangular(1).unwrap(),
            Kernel1d::triangular(1).unwrap(),
            Kernel1d::gaussian_by_size(1).unwrap(),
        ] {
            assert_eq!(k.weights(), &[1.0]);
        }
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(Kernel1d::rectangular(0), Err(LossError::InvalidArgument(_))));
        assert!(matches!(Kernel1d::gaussian_by_size(0), Err(LossError::InvalidArgument(_))));
        assert!(matches!(Kernel1d::gaussian_by_sigma(0.0), Err(LossError::InvalidArgument(_))));
        assert!(matches!(Kernel1d::cauchy(-1.0), Err(LossError::InvalidArgument(_))));
        assert!(matches!(Kernel1d::cauchy(f64::NAN), Err(LossError::InvalidArgument(_))));
    }

    #[test]
    fn test_volume() {
        let k = Kernel1d::triangular(3).unwrap();
        assert_eq!(k.sum(), 4.0);
        assert_eq!(k.volume(3), 64.0);
    }

    #[test]
    fn test_kernel_type_parse() {
        assert_eq!("rectangular".parse::<KernelType>().unwrap(), KernelType::Rectangular);
        assert_eq!("triangular".parse::<KernelType>().unwrap(), KernelType::Triangular);
        assert_eq!("gaussian".parse::<KernelType>().unwrap(), KernelType::Gaussian);

        let err = "gauss".parse::<KernelType>().unwrap_err();
        assert!(matches!(err, LossError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_kernel_type_build() {
        let k = KernelType::Gaussian.build(9).unwrap();
        assert_eq!(k, Kernel1d::gaussian_by_size(9).unwrap());
        assert_eq!(KernelType::Triangular.to_string(), "triangular");
    }
}
