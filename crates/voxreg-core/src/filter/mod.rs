//! Windowed-sum filtering of batched volumes.

pub mod separable;

pub use separable::{separable_filter, SeparableFilter};
