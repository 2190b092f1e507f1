//! Serialized loss configuration.
//!
//! A loss is described by its registry name, a weight and a flat set of
//! hyperparameters:
//!
//! ```json
//! { "name": "lncc", "weight": 2.0, "kernel_size": 7, "kernel_type": "gaussian" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use voxreg_core::{LossError, Result};

use crate::reduction::Reduction;

fn default_weight() -> f64 {
    1.0
}

/// One configured loss term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossConfig {
    /// Registry identifier, e.g. `"lncc"`.
    pub name: String,
    /// Multiplier applied to the reduced loss.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Remaining keys, handed to the loss factory.
    #[serde(flatten)]
    pub params: LossParams,
}

impl LossConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: default_weight(),
            params: LossParams::default(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set one hyperparameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.0.insert(key.into(), value.into());
        self
    }

    /// Parse a single loss configuration from JSON.
    ///
    /// # Errors
    /// `InvalidConfiguration` for malformed JSON or a missing `name`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LossError::invalid_configuration(format!("invalid loss config: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| LossError::invalid_configuration(format!("cannot serialize loss config: {}", e)))
    }
}

/// Loss hyperparameters keyed by name.
///
/// Getters return `Ok(None)` for absent keys and `InvalidConfiguration` for
/// values of the wrong type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LossParams(pub Map<String, Value>);

impl LossParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Reject keys the loss `loss` does not understand.
    pub fn ensure_only(&self, loss: &str, allowed: &[&str]) -> Result<()> {
        match self.0.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(LossError::invalid_configuration(format!(
                "unknown parameter {:?} for loss {:?}, expected one of {:?}",
                key, loss, allowed
            ))),
            None => Ok(()),
        }
    }

    pub fn usize(&self, key: &str) -> Result<Option<usize>> {
        self.typed(key, "a non-negative integer", |v| {
            v.as_u64().and_then(|n| usize::try_from(n).ok())
        })
    }

    pub fn f64(&self, key: &str) -> Result<Option<f64>> {
        self.typed(key, "a number", Value::as_f64)
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        self.typed(key, "a boolean", Value::as_bool)
    }

    pub fn string(&self, key: &str) -> Result<Option<String>> {
        self.typed(key, "a string", |v| v.as_str().map(str::to_string))
    }

    /// The `reduction` key, parsed with [`Reduction::from_str`](std::str::FromStr).
    pub fn reduction(&self) -> Result<Option<Reduction>> {
        self.string("reduction")?.map(|s| s.parse()).transpose()
    }

    fn typed<T>(&self, key: &str, what: &str, extract: impl Fn(&Value) -> Option<T>) -> Result<Option<T>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(value) => extract(value).map(Some).ok_or_else(|| {
                LossError::invalid_configuration(format!(
                    "parameter {:?} must be {}, got {}",
                    key, what, value
                ))
            }),
        }
    }
}
