//! Image similarity metrics and the losses derived from them.

pub mod gncc;
pub mod lncc;
pub mod mutual_information;
pub mod negative;
pub mod ssd;
pub mod trait_;

pub use gncc::{
    GlobalNormalizedCrossCorrelation, GlobalNormalizedCrossCorrelationConfig,
    GlobalNormalizedCrossCorrelationLoss,
};
pub use lncc::{
    LocalNormalizedCrossCorrelation, LocalNormalizedCrossCorrelationConfig,
    LocalNormalizedCrossCorrelationLoss,
};
pub use mutual_information::{
    GlobalMutualInformation, GlobalMutualInformationConfig, GlobalMutualInformationLoss,
};
pub use negative::Negative;
pub use ssd::{SumSquaredDifference, SumSquaredDifferenceConfig};
pub use trait_::{Metric, MetricExt};
