//! Application layer: Use cases and services.
//!
//! This module ties the domain types to the ports: encoding raw records,
//! holding the loaded model artifacts, and serving explained predictions.

mod bundle;
mod prediction;
mod preprocessor;

pub use bundle::ModelBundle;
pub use prediction::{DegradedWarning, Explanation, PredictionReport, PredictionService};
pub use preprocessor::{encode, PreprocessError};
