//! Prediction service: risk classification plus its explanation.
//!
//! Per request:
//! 1. Encode the raw record once
//! 2. Predict the class-1 probability and bucket it into a risk band
//! 3. Attribute the same encoded vector (on a worker thread when bounded)
//! 4. Lay the attribution out as a waterfall and check it against step 2
//!
//! Only steps 1 and 2 can fail a request. Anything going wrong in 3 or 4
//! yields a report without an explanation and with a warning instead.
//!
//! A timed-out worker keeps running until its model returns. Workers are
//! counted, and once `max_pending_attributions` are running new requests
//! skip attribution instead of spawning another thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::domain::{Attribution, EncodedVector, Prediction, RawRecord, Waterfall};
use crate::ports::{AttributionError, Attributor, Classifier, FittedModel};
use crate::SleepRiskError;

use super::bundle::ModelBundle;

/// Attribution and its rendering-ready layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub attribution: Attribution,
    pub waterfall: Waterfall,
}

/// Why a report carries no explanation.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradedWarning {
    #[error("Attribution failed: {message}")]
    AttributionFailed { message: String },

    #[error("Attribution did not finish within {timeout_ms} ms")]
    AttributionTimedOut { timeout_ms: u64 },

    #[error("Attribution skipped: {pending} workers already running")]
    AttributionBusy { pending: usize },

    /// Both values are probabilities.
    #[error("Attribution implies p={waterfall:.6}, model predicts p={model:.6}")]
    InconsistentAttribution { waterfall: f64, model: f64 },
}

/// Counts one running attribution worker until dropped.
struct PendingSlot(Arc<AtomicUsize>);

impl PendingSlot {
    fn acquire(pending: &Arc<AtomicUsize>, limit: usize) -> Option<Self> {
        pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .ok()
            .map(|_| Self(Arc::clone(pending)))
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Outcome of one prediction request.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub model_name: String,
    pub prediction: Prediction,
    pub explanation: Option<Explanation>,
    pub warnings: Vec<DegradedWarning>,
    pub created_at: DateTime<Utc>,
}

impl PredictionReport {
    /// Whether the explanation was withheld.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.explanation.is_none()
    }
}

/// Request handler over a shared model bundle. Clones share the worker count.
#[derive(Debug, Clone)]
pub struct PredictionService {
    bundle: Arc<ModelBundle>,
    attribution_timeout: Option<Duration>,
    consistency_tolerance: f64,
    max_pending: usize,
    /// Shared by clones, so the cap holds per bundle.
    pending: Arc<AtomicUsize>,
}

impl PredictionService {
    pub fn new(bundle: Arc<ModelBundle>, config: &ServiceConfig) -> Self {
        Self {
            bundle,
            attribution_timeout: config.attribution_timeout,
            consistency_tolerance: config.consistency_tolerance,
            max_pending: config.max_pending_attributions.max(1),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn bundle(&self) -> &Arc<ModelBundle> {
        &self.bundle
    }

    /// Attribution workers currently running, including timed-out ones.
    #[must_use]
    pub fn pending_attributions(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Classify one record and explain the result.
    ///
    /// # Errors
    /// - `Preprocess` if the record is incomplete or cannot be encoded
    /// - `Model` if the classifier rejects the vector or returns a non-probability
    pub fn predict(&self, raw: &RawRecord) -> Result<PredictionReport, SleepRiskError> {
        let vector = self.bundle.encode(raw)?;
        tracing::debug!("Encoded {} features", vector.len());

        let probability = self.bundle.model().predict_probability(&vector)?;
        let prediction = Prediction::new(probability);
        tracing::info!(
            "Prediction complete: model={}, score={:.1}, risk={}",
            self.bundle.model_name(),
            prediction.risk_score(),
            prediction.risk_band
        );

        let mut warnings = Vec::new();
        let explanation = match self.explain(vector, probability) {
            Ok(explanation) => Some(explanation),
            Err(warning) => {
                warnings.push(warning);
                None
            }
        };

        Ok(PredictionReport {
            model_name: self.bundle.model_name().to_string(),
            prediction,
            explanation,
            warnings,
            created_at: Utc::now(),
        })
    }

    fn explain(
        &self,
        vector: EncodedVector,
        probability: f64,
    ) -> Result<Explanation, DegradedWarning> {
        let (attribution, vector) = self.attribute(vector)?;

        let waterfall = Waterfall::build(
            &attribution,
            &vector,
            self.bundle.features(),
            self.bundle.catalog(),
        )
        .map_err(|e| {
            tracing::warn!("Attribution does not match the feature set: {}", e);
            DegradedWarning::AttributionFailed {
                message: e.to_string(),
            }
        })?;

        if let Err(e) = waterfall.check_consistency(probability, self.consistency_tolerance) {
            tracing::error!("Withholding explanation: {}", e);
            return Err(DegradedWarning::InconsistentAttribution {
                waterfall: e.waterfall,
                model: e.model,
            });
        }

        Ok(Explanation {
            attribution,
            waterfall,
        })
    }

    /// Run the attributor, bounded by the configured timeout.
    fn attribute(
        &self,
        vector: EncodedVector,
    ) -> Result<(Attribution, EncodedVector), DegradedWarning> {
        let Some(timeout) = self.attribution_timeout else {
            let attribution = self
                .bundle
                .model()
                .explain(&vector)
                .map_err(attribution_failed)?;
            return Ok((attribution, vector));
        };

        let Some(slot) = PendingSlot::acquire(&self.pending, self.max_pending) else {
            tracing::warn!(
                "Skipping attribution: {} workers still running",
                self.max_pending
            );
            return Err(DegradedWarning::AttributionBusy {
                pending: self.max_pending,
            });
        };

        let model: Arc<dyn FittedModel> = Arc::clone(self.bundle.model());
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _slot = slot;
            let result = model.explain(&vector);
            // Receiver is gone once the request has timed out.
            let _ = tx.send((result, vector));
        });

        match rx.recv_timeout(timeout) {
            Ok((result, vector)) => Ok((result.map_err(attribution_failed)?, vector)),
            Err(RecvTimeoutError::Timeout) => {
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!("Attribution timed out after {} ms", timeout_ms);
                Err(DegradedWarning::AttributionTimedOut { timeout_ms })
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("Attribution worker exited without a result");
                Err(DegradedWarning::AttributionFailed {
                    message: "attribution worker panicked".to_string(),
                })
            }
        }
    }
}

fn attribution_failed(e: AttributionError) -> DegradedWarning {
    tracing::warn!("Attribution failed: {}", e);
    DegradedWarning::AttributionFailed {
        message: e.to_string(),
    }
}
