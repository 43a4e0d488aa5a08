//! Classifier and attributor ports.
//!
//! These traits hide which fitted model family is loaded. The core only ever
//! asks for a class-1 probability and for an additive attribution of it.

use crate::domain::{Attribution, EncodedVector};

/// Errors raised while scoring a vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Model expects {expected} features, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("Invalid model parameters: {0}")]
    InvalidParameters(String),

    #[error("Model produced a non-finite output")]
    NonFiniteOutput,
}

/// Errors raised while attributing a prediction.
///
/// These never abort a request; the prediction is returned without its
/// decomposition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributionError {
    #[error("Attribution unsupported for this model: {0}")]
    Unsupported(String),

    #[error("Attribution failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A fitted binary classifier.
pub trait Classifier: Send + Sync {
    /// Number of columns the model was fitted on.
    fn n_features(&self) -> usize;

    /// Class-1 probability for one encoded row.
    ///
    /// The vector's column order must be the order the model was fitted with.
    ///
    /// # Errors
    /// Returns `ModelError::ShapeMismatch` if the width is wrong.
    fn predict_probability(&self, vector: &EncodedVector) -> Result<f64, ModelError>;
}

/// Additive explanation of a classifier's output.
pub trait Attributor: Send + Sync {
    /// One contribution per column plus a baseline.
    ///
    /// The contributions and baseline refer to the same output the
    /// classifier reports as its class-1 probability.
    ///
    /// # Errors
    /// Returns `AttributionError` if the model cannot be explained.
    fn explain(&self, vector: &EncodedVector) -> Result<Attribution, AttributionError>;
}

/// A fitted model that can both predict and explain.
pub trait FittedModel: Classifier + Attributor {
    /// Short family name for logs.
    fn family(&self) -> &'static str;
}
