//! Domain layer: Core types and pure functions.
//!
//! Nothing here performs I/O or depends on a concrete model family.

mod attribution;
mod catalog;
mod feature_set;
mod prediction;
mod record;
mod waterfall;

pub use attribution::{sigmoid, Attribution, FeatureContribution, OutputSpace};
pub use catalog::{FeatureCatalog, FeatureDomain, FeatureKind, FeatureSection, FeatureSpec};
pub use feature_set::{FeatureSet, FeatureSetError};
pub use prediction::{Prediction, RiskBand, HIGH_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD};
pub use record::{EncodedVector, RawRecord};
pub use waterfall::{ConsistencyError, Waterfall, WaterfallError, WaterfallSegment, LABEL_PRECISION};
