//! The process-wide set of loaded model artifacts.
//!
//! A `ModelBundle` is built once at startup, checked for internal
//! consistency, and then shared read-only (behind an `Arc`) by every request.

use std::sync::Arc;

use crate::domain::{EncodedVector, FeatureCatalog, FeatureSet, RawRecord};
use crate::ports::{
    ArtifactError, ArtifactStore, Artifacts, CategoricalEncoder, Classifier, ContinuousScaler,
    FittedModel,
};

use super::preprocessor::{self, PreprocessError};

/// Loaded, mutually consistent model artifacts.
pub struct ModelBundle {
    model_name: String,
    features: FeatureSet,
    encoder: Option<Arc<dyn CategoricalEncoder>>,
    scaler: Option<Arc<dyn ContinuousScaler>>,
    model: Arc<dyn FittedModel>,
    catalog: &'static FeatureCatalog,
}

impl ModelBundle {
    /// Load artifacts from a store and check them against each other.
    ///
    /// # Errors
    /// Returns `ArtifactError` if loading fails or the artifacts disagree.
    pub fn load(store: &impl ArtifactStore) -> Result<Self, ArtifactError> {
        Self::from_artifacts(store.load()?)
    }

    /// Check loaded artifacts against each other.
    ///
    /// # Errors
    /// - `Missing` if a kind has columns but no fitted transform
    /// - `Incompatible` if a transform or the model was fitted on a different
    ///   number of columns than the feature set declares
    pub fn from_artifacts(artifacts: Artifacts) -> Result<Self, ArtifactError> {
        let Artifacts {
            model_name,
            features,
            encoder,
            scaler,
            model,
        } = artifacts;

        let n_categorical = features.categorical().len();
        match &encoder {
            None if n_categorical > 0 => {
                return Err(ArtifactError::Missing(format!(
                    "categorical encoder for {n_categorical} categorical features"
                )));
            }
            Some(encoder) if encoder.width() != n_categorical => {
                return Err(ArtifactError::Incompatible(format!(
                    "encoder fitted on {} columns, feature set has {} categorical",
                    encoder.width(),
                    n_categorical
                )));
            }
            _ => {}
        }

        let n_continuous = features.continuous().len();
        match &scaler {
            None if n_continuous > 0 => {
                return Err(ArtifactError::Missing(format!(
                    "continuous scaler for {n_continuous} continuous features"
                )));
            }
            Some(scaler) if scaler.width() != n_continuous => {
                return Err(ArtifactError::Incompatible(format!(
                    "scaler fitted on {} columns, feature set has {} continuous",
                    scaler.width(),
                    n_continuous
                )));
            }
            _ => {}
        }

        if model.n_features() != features.len() {
            return Err(ArtifactError::Incompatible(format!(
                "model fitted on {} columns, feature set has {}",
                model.n_features(),
                features.len()
            )));
        }

        let catalog = FeatureCatalog::standard();
        for id in features.selected() {
            if catalog.get(id).is_none() {
                tracing::warn!("Selected feature {} is not in the catalog", id);
            }
        }

        Ok(Self {
            model_name,
            features,
            encoder,
            scaler,
            model,
            catalog,
        })
    }

    /// Encode a raw record for this bundle's model.
    ///
    /// # Errors
    /// Returns `PreprocessError` if the record is incomplete or rejected by a
    /// fitted transform.
    pub fn encode(&self, raw: &RawRecord) -> Result<EncodedVector, PreprocessError> {
        preprocessor::encode(
            raw,
            &self.features,
            self.encoder.as_deref(),
            self.scaler.as_deref(),
        )
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    #[must_use]
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    #[must_use]
    pub fn model(&self) -> &Arc<dyn FittedModel> {
        &self.model
    }

    #[must_use]
    pub fn catalog(&self) -> &'static FeatureCatalog {
        self.catalog
    }
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("model_name", &self.model_name)
            .field("family", &self.model.family())
            .field("features", &self.features.selected())
            .finish()
    }
}
