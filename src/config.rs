//! Service configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

/// Default model directory.
pub const DEFAULT_MODEL_DIR: &str = "models";

/// Default bound on one attribution computation.
pub const DEFAULT_ATTRIBUTION_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default tolerance between the waterfall's end and the model output.
pub const DEFAULT_CONSISTENCY_TOLERANCE: f64 = 1e-6;

/// Default cap on attribution workers running at once.
pub const DEFAULT_MAX_PENDING_ATTRIBUTIONS: usize = 8;

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value {value:?} for {name}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: &'static str,
}

/// Runtime settings for the prediction service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Directory holding the exported model artifacts (`SLEEPRISK_MODEL_DIR`).
    pub model_dir: PathBuf,

    /// Upper bound on attribution time; `None` runs it inline without a
    /// bound (`SLEEPRISK_ATTRIBUTION_TIMEOUT_MS`, `0` disables).
    pub attribution_timeout: Option<Duration>,

    /// Allowed gap between the probability implied by the waterfall's final
    /// offset and the model's probability (`SLEEPRISK_CONSISTENCY_TOLERANCE`).
    pub consistency_tolerance: f64,

    /// Attribution workers allowed to run at once; requests beyond it skip
    /// attribution (`SLEEPRISK_MAX_PENDING_ATTRIBUTIONS`, must be > 0).
    pub max_pending_attributions: usize,

    /// Refuse model directories without a hash manifest
    /// (`SLEEPRISK_REQUIRE_MANIFEST`).
    pub require_manifest: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            attribution_timeout: Some(DEFAULT_ATTRIBUTION_TIMEOUT),
            consistency_tolerance: DEFAULT_CONSISTENCY_TOLERANCE,
            max_pending_attributions: DEFAULT_MAX_PENDING_ATTRIBUTIONS,
            require_manifest: false,
        }
    }
}

impl ServiceConfig {
    /// Read configuration from process environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("SLEEPRISK_MODEL_DIR").filter(|v| !v.trim().is_empty()) {
            config.model_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup("SLEEPRISK_ATTRIBUTION_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| ConfigError {
                name: "SLEEPRISK_ATTRIBUTION_TIMEOUT_MS",
                value: raw.clone(),
                reason: "expected a non-negative integer",
            })?;
            config.attribution_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        if let Some(raw) = lookup("SLEEPRISK_CONSISTENCY_TOLERANCE") {
            let tolerance: f64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|t: &f64| t.is_finite() && *t >= 0.0)
                .ok_or_else(|| ConfigError {
                    name: "SLEEPRISK_CONSISTENCY_TOLERANCE",
                    value: raw.clone(),
                    reason: "expected a finite non-negative number",
                })?;
            config.consistency_tolerance = tolerance;
        }

        if let Some(raw) = lookup("SLEEPRISK_MAX_PENDING_ATTRIBUTIONS") {
            config.max_pending_attributions = raw
                .trim()
                .parse()
                .ok()
                .filter(|n: &usize| *n > 0)
                .ok_or_else(|| ConfigError {
                    name: "SLEEPRISK_MAX_PENDING_ATTRIBUTIONS",
                    value: raw.clone(),
                    reason: "expected a positive integer",
                })?;
        }

        if let Some(raw) = lookup("SLEEPRISK_REQUIRE_MANIFEST") {
            config.require_manifest = parse_bool(&raw).ok_or_else(|| ConfigError {
                name: "SLEEPRISK_REQUIRE_MANIFEST",
                value: raw.clone(),
                reason: "expected true/false",
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}
