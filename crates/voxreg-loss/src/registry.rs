//! Name-keyed construction of losses from configuration.
//!
//! Image losses and regularizers are built from a [`LossConfig`] by looking up
//! its name among registered factories. The built-in names are:
//!
//! | name       | loss                                   |
//! |------------|----------------------------------------|
//! | `ssd`      | `SumSquaredDifference`                 |
//! | `gmi`      | `GlobalMutualInformationLoss`          |
//! | `lncc`     | `LocalNormalizedCrossCorrelationLoss`  |
//! | `gncc`     | `GlobalNormalizedCrossCorrelationLoss` |
//! | `gradient` | `GradientNorm`                         |
//! | `bending`  | `BendingEnergy`                        |

use std::collections::HashMap;

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxreg_core::{LossError, Result};

use crate::config::{LossConfig, LossParams};
use crate::metric::{
    GlobalMutualInformationConfig, GlobalNormalizedCrossCorrelationConfig,
    LocalNormalizedCrossCorrelationConfig, Metric, MetricExt, SumSquaredDifferenceConfig,
};
use crate::regularization::{BendingEnergyConfig, GradientNormConfig, Regularizer, RegularizerExt};

/// Boxed image loss, minimized during registration.
pub type BoxedImageLoss<B> = Box<dyn Metric<B> + Send + Sync>;

/// Boxed deformation regularizer.
pub type BoxedRegularizer<B> = Box<dyn Regularizer<B> + Send + Sync>;

/// Builds an image loss from its hyperparameters.
pub type ImageLossFactory<B> = Box<dyn Fn(&LossParams) -> Result<BoxedImageLoss<B>> + Send + Sync>;

/// Builds a regularizer from its hyperparameters.
pub type RegularizerFactory<B> = Box<dyn Fn(&LossParams) -> Result<BoxedRegularizer<B>> + Send + Sync>;

/// Registry of loss factories, keyed by exact name.
pub struct LossRegistry<B: Backend> {
    image_losses: HashMap<String, ImageLossFactory<B>>,
    regularizers: HashMap<String, RegularizerFactory<B>>,
}

impl<B: Backend> LossRegistry<B> {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            image_losses: HashMap::new(),
            regularizers: HashMap::new(),
        }
    }

    /// Registry holding every built-in loss.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert_image_loss("ssd", build_ssd::<B>);
        registry.insert_image_loss("gmi", build_gmi::<B>);
        registry.insert_image_loss("lncc", build_lncc::<B>);
        registry.insert_image_loss("gncc", build_gncc::<B>);
        registry.insert_regularizer("gradient", build_gradient::<B>);
        registry.insert_regularizer("bending", build_bending::<B>);
        registry
    }

    fn insert_image_loss<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&LossParams) -> Result<BoxedImageLoss<B>> + Send + Sync + 'static,
    {
        self.image_losses.insert(name.to_string(), Box::new(factory));
    }

    fn insert_regularizer<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&LossParams) -> Result<BoxedRegularizer<B>> + Send + Sync + 'static,
    {
        self.regularizers.insert(name.to_string(), Box::new(factory));
    }

    /// Register an image loss factory.
    ///
    /// # Errors
    /// `InvalidConfiguration` if `name` is already taken.
    pub fn register_image_loss<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn(&LossParams) -> Result<BoxedImageLoss<B>> + Send + Sync + 'static,
    {
        if self.image_losses.contains_key(name) {
            return Err(LossError::invalid_configuration(format!(
                "image loss {:?} is already registered",
                name
            )));
        }
        self.insert_image_loss(name, factory);
        Ok(())
    }

    /// Register a regularizer factory.
    ///
    /// # Errors
    /// `InvalidConfiguration` if `name` is already taken.
    pub fn register_regularizer<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn(&LossParams) -> Result<BoxedRegularizer<B>> + Send + Sync + 'static,
    {
        if self.regularizers.contains_key(name) {
            return Err(LossError::invalid_configuration(format!(
                "regularizer {:?} is already registered",
                name
            )));
        }
        self.insert_regularizer(name, factory);
        Ok(())
    }

    /// Build the image loss named by `config`. The weight is not applied.
    pub fn build_image_loss(&self, config: &LossConfig) -> Result<BoxedImageLoss<B>> {
        let factory = self.image_losses.get(&config.name).ok_or_else(|| {
            LossError::invalid_configuration(format!(
                "unknown image loss {:?}, expected one of {:?}",
                config.name,
                self.image_loss_names()
            ))
        })?;
        let loss = factory(&config.params)?;
        tracing::debug!(name = %config.name, loss = loss.name(), "built image loss");
        Ok(loss)
    }

    /// Build the regularizer named by `config`. The weight is not applied.
    pub fn build_regularizer(&self, config: &LossConfig) -> Result<BoxedRegularizer<B>> {
        let factory = self.regularizers.get(&config.name).ok_or_else(|| {
            LossError::invalid_configuration(format!(
                "unknown regularizer {:?}, expected one of {:?}",
                config.name,
                self.regularizer_names()
            ))
        })?;
        let regularizer = factory(&config.params)?;
        tracing::debug!(name = %config.name, regularizer = regularizer.name(), "built regularizer");
        Ok(regularizer)
    }

    /// Build the image loss together with its weight.
    pub fn build_image_term(&self, config: &LossConfig) -> Result<ImageLossTerm<B>> {
        Ok(ImageLossTerm {
            loss: self.build_image_loss(config)?,
            weight: config.weight,
        })
    }

    /// Build the regularizer together with its weight.
    pub fn build_regularizer_term(&self, config: &LossConfig) -> Result<RegularizerTerm<B>> {
        Ok(RegularizerTerm {
            regularizer: self.build_regularizer(config)?,
            weight: config.weight,
        })
    }

    /// Registered image loss names, sorted.
    pub fn image_loss_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.image_losses.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered regularizer names, sorted.
    pub fn regularizer_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.regularizers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn build_ssd<B: Backend>(params: &LossParams) -> Result<BoxedImageLoss<B>> {
    Ok(Box::new(SumSquaredDifferenceConfig::from_params(params)?.init()))
}

fn build_gmi<B: Backend>(params: &LossParams) -> Result<BoxedImageLoss<B>> {
    Ok(Box::new(GlobalMutualInformationConfig::from_params(params)?.init_loss()?))
}

fn build_lncc<B: Backend>(params: &LossParams) -> Result<BoxedImageLoss<B>> {
    Ok(Box::new(LocalNormalizedCrossCorrelationConfig::from_params(params)?.init_loss()?))
}

fn build_gncc<B: Backend>(params: &LossParams) -> Result<BoxedImageLoss<B>> {
    Ok(Box::new(GlobalNormalizedCrossCorrelationConfig::from_params(params)?.init_loss()))
}

fn build_gradient<B: Backend>(params: &LossParams) -> Result<BoxedRegularizer<B>> {
    Ok(Box::new(GradientNormConfig::from_params(params)?.init()))
}

fn build_bending<B: Backend>(params: &LossParams) -> Result<BoxedRegularizer<B>> {
    Ok(Box::new(BendingEnergyConfig::from_params(params)?.init()))
}

impl<B: Backend> Default for LossRegistry<B> {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Image loss paired with its weight.
pub struct ImageLossTerm<B: Backend> {
    pub loss: BoxedImageLoss<B>,
    pub weight: f64,
}

impl<B: Backend> ImageLossTerm<B> {
    /// Reduced loss multiplied by the weight.
    pub fn evaluate<const D: usize>(&self, y_true: Tensor<B, D>, y_pred: Tensor<B, D>) -> Result<Tensor<B, 1>> {
        Ok(self.loss.forward(y_true, y_pred)?.mul_scalar(self.weight))
    }
}

/// Regularizer paired with its weight.
pub struct RegularizerTerm<B: Backend> {
    pub regularizer: BoxedRegularizer<B>,
    pub weight: f64,
}

impl<B: Backend> RegularizerTerm<B> {
    /// Reduced penalty multiplied by the weight.
    pub fn evaluate<const D: usize>(&self, displacement: Tensor<B, D>) -> Result<Tensor<B, 1>> {
        Ok(self.regularizer.forward(displacement)?.mul_scalar(self.weight))
    }
}
