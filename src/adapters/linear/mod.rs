//! Logistic regression model with exact linear attribution.
//!
//! `p = σ(intercept + Σ wᵢxᵢ)`. Against background means μ, each feature
//! contributes `wᵢ(xᵢ − μᵢ)` in log-odds space and the baseline is
//! `intercept + Σ wᵢμᵢ`, so baseline plus contributions is exactly the
//! model's log-odds.

use serde::{Deserialize, Serialize};

use crate::domain::{sigmoid, Attribution, EncodedVector, OutputSpace};
use crate::ports::{AttributionError, Attributor, Classifier, FittedModel, ModelError};

/// Fitted logistic regression exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,

    /// Mean of each encoded training column. Required for attribution.
    #[serde(default)]
    pub background_mean: Option<Vec<f64>>,
}

impl LogisticModel {
    /// Sanity-check fitted parameters.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidParameters` on empty or non-finite
    /// coefficients, or background means of the wrong width or non-finite.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.coefficients.is_empty() {
            return Err(ModelError::InvalidParameters("no coefficients".into()));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::InvalidParameters(
                "coefficients must be finite".into(),
            ));
        }
        if let Some(mean) = &self.background_mean {
            if mean.len() != self.coefficients.len() {
                return Err(ModelError::InvalidParameters(format!(
                    "background_mean has {} entries, expected {}",
                    mean.len(),
                    self.coefficients.len()
                )));
            }
            if mean.iter().any(|m| !m.is_finite()) {
                return Err(ModelError::InvalidParameters(
                    "background_mean must be finite".into(),
                ));
            }
        }
        Ok(())
    }

    fn check_shape(&self, vector: &EncodedVector) -> Result<(), ModelError> {
        if vector.len() != self.coefficients.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.coefficients.len(),
                got: vector.len(),
            });
        }
        Ok(())
    }

    /// Log-odds of class 1.
    fn margin(&self, values: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(values)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl Classifier for LogisticModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_probability(&self, vector: &EncodedVector) -> Result<f64, ModelError> {
        self.check_shape(vector)?;
        let p = sigmoid(self.margin(vector.values()));
        if p.is_nan() {
            return Err(ModelError::NonFiniteOutput);
        }
        Ok(p)
    }
}

impl Attributor for LogisticModel {
    fn explain(&self, vector: &EncodedVector) -> Result<Attribution, AttributionError> {
        self.check_shape(vector)?;
        let mean = self.background_mean.as_ref().ok_or_else(|| {
            AttributionError::Unsupported("model was exported without background means".into())
        })?;

        let baseline = self.margin(mean);
        let values = self
            .coefficients
            .iter()
            .zip(vector.values().iter().zip(mean))
            .map(|(w, (x, m))| w * (x - m))
            .collect();

        Ok(Attribution::new(
            baseline,
            vector.columns(),
            values,
            OutputSpace::LogOdds,
        ))
    }
}

impl FittedModel for LogisticModel {
    fn family(&self) -> &'static str {
        "logistic_regression"
    }
}
