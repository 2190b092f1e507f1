//! Regularization of dense displacement fields.
//!
//! # Available Regularizers
//!
//! * **GradientNorm**: First-order smoothness, l1 or l2 norm of the gradient
//! * **BendingEnergy**: Second-order smoothness, thin-plate bending energy

pub mod bending_energy;
pub mod gradient_norm;
pub mod trait_;

pub use bending_energy::{BendingEnergy, BendingEnergyConfig};
pub use gradient_norm::{GradientNorm, GradientNormConfig};
pub use trait_::{Regularizer, RegularizerExt};
