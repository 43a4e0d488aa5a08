//! Artifact store port: source of the pre-fitted model artifacts.
//!
//! Artifacts are loaded once at startup. Any failure here is fatal: the
//! service refuses to start rather than serve a partial model.

use std::sync::Arc;

use crate::domain::{FeatureSet, FeatureSetError};

use super::{CategoricalEncoder, ContinuousScaler, FittedModel, ModelError};

/// Errors raised while loading artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact missing: {0}")]
    Missing(String),

    #[error("Artifact unreadable: {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact malformed: {path}: {message}")]
    Malformed { path: String, message: String },

    #[error("Artifact integrity check failed for {0}")]
    Integrity(String),

    #[error("Invalid feature set: {0}")]
    FeatureSet(#[from] FeatureSetError),

    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),

    #[error("Artifacts disagree: {0}")]
    Incompatible(String),
}

/// Everything a model directory provides.
pub struct Artifacts {
    pub model_name: String,
    pub features: FeatureSet,
    pub encoder: Option<Arc<dyn CategoricalEncoder>>,
    pub scaler: Option<Arc<dyn ContinuousScaler>>,
    pub model: Arc<dyn FittedModel>,
}

impl std::fmt::Debug for Artifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifacts")
            .field("model_name", &self.model_name)
            .field("features", &self.features)
            .field("encoder", &self.encoder.is_some())
            .field("scaler", &self.scaler.is_some())
            .field("model", &self.model.family())
            .finish()
    }
}

/// Trait for artifact sources.
pub trait ArtifactStore {
    /// Load every artifact needed to serve predictions.
    ///
    /// # Errors
    /// Returns `ArtifactError` if any required artifact is missing or invalid.
    fn load(&self) -> Result<Artifacts, ArtifactError>;
}
