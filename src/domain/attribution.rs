//! Additive per-feature attribution of a single prediction.

use serde::{Deserialize, Serialize};

/// Space in which an attribution is additive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSpace {
    /// Contributions sum to the class-1 probability.
    Probability,
    /// Contributions sum to the log-odds of the class-1 probability.
    LogOdds,
}

impl OutputSpace {
    /// Map a probability into this space.
    #[must_use]
    pub fn from_probability(&self, probability: f64) -> f64 {
        match self {
            Self::Probability => probability,
            Self::LogOdds => (probability / (1.0 - probability)).ln(),
        }
    }

    /// Map a value of this space back to a probability.
    #[must_use]
    pub fn to_probability(&self, value: f64) -> f64 {
        match self {
            Self::Probability => value,
            Self::LogOdds => sigmoid(value),
        }
    }
}

/// Logistic function.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Signed effect of one feature on the prediction, relative to the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    /// Positive values increase predicted risk.
    pub value: f64,
}

/// Baseline plus one contribution per feature, in feature-set order.
///
/// `baseline + Σ value` equals the model output for the explained vector,
/// expressed in `space`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub baseline: f64,
    pub contributions: Vec<FeatureContribution>,
    pub space: OutputSpace,
}

impl Attribution {
    /// Pair feature identifiers with contribution values, in order.
    #[must_use]
    pub fn new(baseline: f64, features: &[String], values: Vec<f64>, space: OutputSpace) -> Self {
        let contributions = features
            .iter()
            .zip(values)
            .map(|(feature, value)| FeatureContribution {
                feature: feature.clone(),
                value,
            })
            .collect();
        Self {
            baseline,
            contributions,
            space,
        }
    }

    /// `baseline + Σ contributions`, summed in feature-set order.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.baseline + self.contributions.iter().map(|c| c.value).sum::<f64>()
    }

    #[must_use]
    pub fn get(&self, feature: &str) -> Option<f64> {
        self.contributions
            .iter()
            .find(|c| c.feature == feature)
            .map(|c| c.value)
    }
}
