//! JSON artifact store: loads a model directory exported by the training
//! pipeline.
//!
//! # Layout
//!
//! - `selected_features.json`, or `model_features_info.json` as a fallback:
//!   feature selection and, optionally, `best_model_name`
//! - `best_model_<name>.json`: the fitted model (tagged by `kind`)
//! - `ordinal_encoder.json`, `scaler_continuous.json`: optional fitted
//!   transforms
//! - `manifest.json`: optional map of file name to SHA-256 hex digest
//!
//! # Integrity
//!
//! When a manifest is present, every file it lists MUST exist with a matching
//! digest, and every artifact file read MUST be listed in it. A store built
//! with `require_manifest(true)` refuses to load a directory without one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::adapters::linear::LogisticModel;
use crate::adapters::sklearn::{OrdinalEncoder, StandardScaler};
use crate::adapters::trees::TreeEnsemble;
use crate::domain::FeatureSet;
use crate::ports::{
    ArtifactError, ArtifactStore, Artifacts, CategoricalEncoder, ContinuousScaler, FittedModel,
};

const FEATURES_FILE: &str = "selected_features.json";
const FEATURES_INFO_FILE: &str = "model_features_info.json";
const ENCODER_FILE: &str = "ordinal_encoder.json";
const SCALER_FILE: &str = "scaler_continuous.json";
const MANIFEST_FILE: &str = "manifest.json";
const MODEL_PREFIX: &str = "best_model_";
const MODEL_SUFFIX: &str = ".json";

/// Fitted model file, tagged by family.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticModel),
    TreeEnsemble(TreeEnsemble),
}

impl ModelArtifact {
    /// Validate and erase the concrete family.
    ///
    /// # Errors
    /// Returns `ModelError` if the fitted parameters are inconsistent.
    pub fn into_model(self) -> Result<Arc<dyn FittedModel>, crate::ports::ModelError> {
        match self {
            Self::LogisticRegression(model) => {
                model.validate()?;
                Ok(Arc::new(model))
            }
            // Validated during deserialization.
            Self::TreeEnsemble(model) => Ok(Arc::new(model)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeaturesInfo {
    selected_features: Vec<String>,
    #[serde(default)]
    selected_categorical: Vec<String>,
    #[serde(default)]
    selected_continuous: Vec<String>,
    #[serde(default)]
    best_model_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    files: BTreeMap<String, String>,
}

fn sha256_hex_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Artifact store backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonArtifactStore {
    dir: PathBuf,
    require_manifest: bool,
}

impl JsonArtifactStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            require_manifest: false,
        }
    }

    /// Refuse directories without a `manifest.json`.
    #[must_use]
    pub fn require_manifest(mut self, require: bool) -> Self {
        self.require_manifest = require;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_string(&self, name: &str) -> String {
        self.dir.join(name).display().to_string()
    }

    fn read_raw(&self, name: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read(&path)
            .map(Some)
            .map_err(|source| ArtifactError::Unreadable {
                path: path.display().to_string(),
                source,
            })
    }

    /// Read a file, checking it against the manifest when one is loaded.
    fn read_verified(
        &self,
        name: &str,
        manifest: Option<&Manifest>,
    ) -> Result<Option<Vec<u8>>, ArtifactError> {
        let Some(bytes) = self.read_raw(name)? else {
            return Ok(None);
        };

        if let Some(manifest) = manifest {
            let expected = manifest
                .files
                .get(name)
                .ok_or_else(|| ArtifactError::Integrity(format!("{name} (not in manifest)")))?;
            if !sha256_hex_bytes(&bytes).eq_ignore_ascii_case(expected.trim()) {
                return Err(ArtifactError::Integrity(name.to_string()));
            }
        }

        Ok(Some(bytes))
    }

    fn parse<T: DeserializeOwned>(&self, name: &str, bytes: &[u8]) -> Result<T, ArtifactError> {
        serde_json::from_slice(bytes).map_err(|e| ArtifactError::Malformed {
            path: self.path_string(name),
            message: e.to_string(),
        })
    }

    fn load_json<T: DeserializeOwned>(
        &self,
        name: &str,
        manifest: Option<&Manifest>,
    ) -> Result<Option<T>, ArtifactError> {
        match self.read_verified(name, manifest)? {
            Some(bytes) => self.parse(name, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn load_manifest(&self) -> Result<Option<Manifest>, ArtifactError> {
        let manifest: Option<Manifest> = match self.read_raw(MANIFEST_FILE)? {
            Some(bytes) => Some(self.parse(MANIFEST_FILE, &bytes)?),
            None => None,
        };

        if manifest.is_none() && self.require_manifest {
            return Err(ArtifactError::Missing(self.path_string(MANIFEST_FILE)));
        }
        if manifest.is_none() {
            tracing::warn!(
                "No {} in {:?}; artifact hashes not verified",
                MANIFEST_FILE,
                self.dir
            );
        }
        Ok(manifest)
    }

    /// Check every file the manifest lists, whether or not it is loaded.
    fn verify_manifest(&self, manifest: &Manifest) -> Result<(), ArtifactError> {
        for (name, expected) in &manifest.files {
            if Path::new(name).file_name() != Some(std::ffi::OsStr::new(name)) {
                return Err(ArtifactError::Integrity(format!("{name} (not a file name)")));
            }
            let bytes = self.read_raw(name)?.ok_or_else(|| {
                tracing::error!("Manifest lists {} but it is missing", name);
                ArtifactError::Integrity(name.clone())
            })?;
            if !sha256_hex_bytes(&bytes).eq_ignore_ascii_case(expected.trim()) {
                return Err(ArtifactError::Integrity(name.clone()));
            }
        }
        tracing::debug!("Verified {} manifest entries", manifest.files.len());
        Ok(())
    }

    /// First `best_model_<name>.json` in sorted order.
    fn discover_model_name(&self) -> Result<String, ArtifactError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| ArtifactError::Unreadable {
            path: self.dir.display().to_string(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|file| {
                file.strip_prefix(MODEL_PREFIX)
                    .and_then(|rest| rest.strip_suffix(MODEL_SUFFIX))
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            })
            .collect();
        names.sort();

        names.into_iter().next().ok_or_else(|| {
            ArtifactError::Missing(format!(
                "{} (no {MODEL_PREFIX}<name>{MODEL_SUFFIX} file)",
                self.dir.display()
            ))
        })
    }
}

impl ArtifactStore for JsonArtifactStore {
    fn load(&self) -> Result<Artifacts, ArtifactError> {
        if !self.dir.is_dir() {
            return Err(ArtifactError::Missing(self.dir.display().to_string()));
        }
        tracing::info!("Loading model artifacts from {:?}", self.dir);

        let manifest = self.load_manifest()?;
        if let Some(manifest) = &manifest {
            self.verify_manifest(manifest)?;
        }
        let manifest = manifest.as_ref();

        let info: FeaturesInfo = match self.load_json(FEATURES_FILE, manifest)? {
            Some(info) => info,
            None => self
                .load_json(FEATURES_INFO_FILE, manifest)?
                .ok_or_else(|| {
                    ArtifactError::Missing(format!(
                        "{} or {}",
                        self.path_string(FEATURES_FILE),
                        FEATURES_INFO_FILE
                    ))
                })?,
        };

        let features = FeatureSet::new(
            info.selected_features,
            info.selected_categorical,
            info.selected_continuous,
        )?;

        let model_name = match info.best_model_name {
            Some(name) => name,
            None => self.discover_model_name()?,
        };
        let model_file = format!("{MODEL_PREFIX}{model_name}{MODEL_SUFFIX}");
        let model: ModelArtifact = self
            .load_json(&model_file, manifest)?
            .ok_or_else(|| ArtifactError::Missing(self.path_string(&model_file)))?;
        let model = model.into_model()?;

        let encoder = match self.load_json::<OrdinalEncoder>(ENCODER_FILE, manifest)? {
            Some(encoder) => {
                encoder.validate().map_err(|message| ArtifactError::Malformed {
                    path: self.path_string(ENCODER_FILE),
                    message,
                })?;
                Some(Arc::new(encoder) as Arc<dyn CategoricalEncoder>)
            }
            None => None,
        };

        let scaler = match self.load_json::<StandardScaler>(SCALER_FILE, manifest)? {
            Some(scaler) => {
                scaler.validate().map_err(|message| ArtifactError::Malformed {
                    path: self.path_string(SCALER_FILE),
                    message,
                })?;
                Some(Arc::new(scaler) as Arc<dyn ContinuousScaler>)
            }
            None => None,
        };

        tracing::info!(
            "Loaded model {} ({}, {} features, encoder={}, scaler={})",
            model_name,
            model.family(),
            features.len(),
            encoder.is_some(),
            scaler.is_some()
        );

        Ok(Artifacts {
            model_name,
            features,
            encoder,
            scaler,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Classifier;
    use tempfile::tempdir;

    const FEATURES: &str = r#"{
        "selected_features": ["gender", "age"],
        "selected_categorical": ["gender"],
        "selected_continuous": ["age"]
    }"#;

    const MODEL: &str = r#"{
        "kind": "logistic_regression",
        "coefficients": [0.4, 0.8],
        "intercept": -1.0,
        "background_mean": [0.5, 0.0]
    }"#;

    const ENCODER: &str = r#"{"categories": [[0, 1]]}"#;
    const SCALER: &str = r#"{"mean": [62.0], "scale": [9.0]}"#;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).expect("write artifact");
    }

    fn write_complete(dir: &Path) {
        write(dir, FEATURES_FILE, FEATURES);
        write(dir, "best_model_logreg.json", MODEL);
        write(dir, ENCODER_FILE, ENCODER);
        write(dir, SCALER_FILE, SCALER);
    }

    fn write_manifest(dir: &Path, names: &[&str]) {
        let files: BTreeMap<String, String> = names
            .iter()
            .map(|name| {
                let bytes = std::fs::read(dir.join(name)).expect("read artifact");
                ((*name).to_string(), sha256_hex_bytes(&bytes))
            })
            .collect();
        let manifest = serde_json::json!({ "files": files });
        write(dir, MANIFEST_FILE, &manifest.to_string());
    }

    #[test]
    fn test_loads_complete_directory() {
        let temp = tempdir().expect("tempdir");
        write_complete(temp.path());

        let artifacts = JsonArtifactStore::new(temp.path()).load().expect("complete directory");
        assert_eq!(artifacts.model_name, "logreg");
        assert_eq!(artifacts.features.selected(), &["gender".to_string(), "age".to_string()]);
        assert_eq!(artifacts.model.n_features(), 2);
        assert_eq!(artifacts.model.family(), "logistic_regression");
        assert!(artifacts.encoder.is_some());
        assert!(artifacts.scaler.is_some());
    }

    #[test]
    fn test_model_name_from_features_info() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        write(
            dir,
            FEATURES_INFO_FILE,
            &serde_json::json!({
                "selected_features": ["age"],
                "selected_continuous": ["age"],
                "best_model_name": "b",
            })
            .to_string(),
        );
        write(
            dir,
            "best_model_a.json",
            r#"{"kind": "logistic_regression", "coefficients": [1.0], "intercept": 0.0}"#,
        );
        write(
            dir,
            "best_model_b.json",
            r#"{"kind": "logistic_regression", "coefficients": [2.0], "intercept": 0.0}"#,
        );

        let artifacts = JsonArtifactStore::new(dir).load().expect("fallback features file");
        assert_eq!(artifacts.model_name, "b");
        assert!(artifacts.encoder.is_none());
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let temp = tempdir().expect("tempdir");
        write(temp.path(), FEATURES_FILE, FEATURES);

        let err = JsonArtifactStore::new(temp.path())
            .load()
            .expect_err("no model file");
        assert!(matches!(err, ArtifactError::Missing(_)));

        let err = JsonArtifactStore::new(temp.path().join("nope"))
            .load()
            .expect_err("no directory");
        assert!(matches!(err, ArtifactError::Missing(_)));
    }

    #[test]
    fn test_malformed_model_is_fatal() {
        let temp = tempdir().expect("tempdir");
        write_complete(temp.path());
        write(
            temp.path(),
            "best_model_logreg.json",
            r#"{"kind": "logistic_regression", "coefficients": [], "intercept": 0.0}"#,
        );

        let err = JsonArtifactStore::new(temp.path())
            .load()
            .expect_err("empty coefficients");
        assert!(matches!(err, ArtifactError::Model(_)));
    }

    #[test]
    fn test_manifest_verifies_hashes() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        write_complete(dir);
        write_manifest(
            dir,
            &[FEATURES_FILE, "best_model_logreg.json", ENCODER_FILE, SCALER_FILE],
        );

        JsonArtifactStore::new(dir)
            .require_manifest(true)
            .load()
            .expect("hashes match");

        // Tamper with the scaler after signing the manifest.
        write(dir, SCALER_FILE, r#"{"mean": [0.0], "scale": [1.0]}"#);
        let err = JsonArtifactStore::new(dir).load().expect_err("hash mismatch");
        assert!(matches!(err, ArtifactError::Integrity(name) if name == SCALER_FILE));
    }

    #[test]
    fn test_manifest_must_cover_loaded_files() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        write_complete(dir);
        write_manifest(dir, &[FEATURES_FILE, "best_model_logreg.json"]);

        let err = JsonArtifactStore::new(dir).load().expect_err("encoder not listed");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_manifest_entries_must_exist() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        write(
            dir,
            FEATURES_FILE,
            r#"{"selected_features": ["age"], "selected_continuous": ["age"]}"#,
        );
        write(
            dir,
            "best_model_logreg.json",
            r#"{"kind": "logistic_regression", "coefficients": [1.0], "intercept": 0.0}"#,
        );
        write(dir, SCALER_FILE, SCALER);
        write(dir, ENCODER_FILE, ENCODER);
        write_manifest(
            dir,
            &[FEATURES_FILE, "best_model_logreg.json", SCALER_FILE, ENCODER_FILE],
        );
        JsonArtifactStore::new(dir).load().expect("every listed file present");

        // Continuous-only model: the encoder is never read, but it is listed.
        std::fs::remove_file(dir.join(ENCODER_FILE)).expect("remove encoder");
        let err = JsonArtifactStore::new(dir).load().expect_err("listed file missing");
        assert!(matches!(err, ArtifactError::Integrity(name) if name == ENCODER_FILE));
    }

    #[test]
    fn test_manifest_entries_are_plain_file_names() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        write_complete(dir);
        let manifest = serde_json::json!({ "files": { "../outside.json": "00" } });
        write(dir, MANIFEST_FILE, &manifest.to_string());

        let err = JsonArtifactStore::new(dir).load().expect_err("path escapes the directory");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_required_manifest_missing() {
        let temp = tempdir().expect("tempdir");
        write_complete(temp.path());

        let err = JsonArtifactStore::new(temp.path())
            .require_manifest(true)
            .load()
            .expect_err("manifest required");
        assert!(matches!(err, ArtifactError::Missing(_)));
    }
}
