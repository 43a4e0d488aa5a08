//! # sleeprisk
//!
//! Sleep-quality risk prediction with per-feature explanations.
//!
//! This crate provides:
//! - Validation and encoding of health-survey answers into a model's input row
//! - Class-1 probability and risk band from a pre-fitted binary classifier
//! - Additive per-feature attribution laid out as a cumulative waterfall
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (feature catalog, records, predictions, waterfall)
//! - `ports`: Trait definitions for fitted transforms, models and artifact loading
//! - `adapters`: Concrete implementations (sklearn-style transforms, models, JSON store)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Environment-driven service settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{ModelBundle, PredictionReport, PredictionService};
pub use config::ServiceConfig;
pub use domain::{Prediction, RawRecord, RiskBand};

/// Result type for sleeprisk operations
pub type Result<T> = std::result::Result<T, SleepRiskError>;

/// Main error type for sleeprisk
#[derive(Debug, thiserror::Error)]
pub enum SleepRiskError {
    #[error("Invalid input: {0}")]
    Preprocess(#[from] application::PreprocessError),

    #[error("Model evaluation failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Model artifacts unusable: {0}")]
    Artifact(#[from] ports::ArtifactError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
