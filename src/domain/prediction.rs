//! Prediction result types.
//!
//! Represents the class-1 probability produced by the sleep-quality model and
//! its discretized risk band.

use serde::{Deserialize, Serialize};

/// Risk score (probability × 100) at which the Medium band starts.
pub const MEDIUM_RISK_THRESHOLD: f64 = 25.0;

/// Risk score (probability × 100) at which the High band starts.
pub const HIGH_RISK_THRESHOLD: f64 = 35.0;

/// Risk band for developing sleep-quality problems within the next two years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskBand {
    /// Risk score below 25
    Low,
    /// Risk score in [25, 35)
    Medium,
    /// Risk score of 35 or more
    High,
}

impl RiskBand {
    /// Classify a risk score expressed in percent.
    ///
    /// A NaN score is classified as High.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score < MEDIUM_RISK_THRESHOLD {
            Self::Low
        } else if score < HIGH_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Classify a probability in [0, 1].
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        Self::from_score(probability * 100.0)
    }

    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => {
                "Low risk of developing sleep quality problems in the next two years. \
                 Current sleep status is good; keep maintaining a healthy lifestyle."
            }
            Self::Medium => {
                "Moderate risk of developing sleep quality problems in the next two years. \
                 Preventive measures are advised to avoid further risk elevation."
            }
            Self::High => {
                "High risk of developing sleep quality problems in the next two years. \
                 Prompt intervention and close monitoring of sleep status are strongly advised."
            }
        }
    }

    /// Preventive recommendations for the band.
    #[must_use]
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            Self::Low => &[
                "Maintain a regular sleep schedule with fixed bedtime and wake time",
                "Continue moderate exercise such as walking or tai chi",
                "Keep a balanced diet and avoid caffeine before bedtime",
                "Stay socially active",
                "Attend regular health checkups",
            ],
            Self::Medium => &[
                "Establish good sleep hygiene: a comfortable, quiet and dark bedroom",
                "Control chronic diseases with regular medical visits",
                "Increase social activities to reduce loneliness",
                "Consult a mental health professional if depressive or anxious symptoms appear",
                "Quit smoking, limit alcohol and keep a regular schedule",
                "Follow up every 3-6 months",
            ],
            Self::High => &[
                "Seek a professional evaluation at a sleep clinic",
                "Actively treat underlying conditions such as hypertension and diabetes",
                "Consider psychological counseling or cognitive behavioral therapy",
                "Use sleep aids only under medical guidance",
                "Keep a strict sleep schedule and avoid long daytime naps",
                "Seek emotional support from family and friends",
                "Follow up monthly and adjust the treatment plan promptly",
            ],
        }
    }

    /// Get the associated color for display (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Low => (76, 175, 80),    // #4CAF50
            Self::Medium => (255, 152, 0), // #FF9800
            Self::High => (244, 67, 54),   // #F44336
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Model output for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class-1 probability (0.0 to 1.0)
    pub probability: f64,

    /// Risk band derived from the probability
    pub risk_band: RiskBand,
}

impl Prediction {
    #[must_use]
    pub fn new(probability: f64) -> Self {
        Self {
            probability,
            risk_band: RiskBand::from_probability(probability),
        }
    }

    /// Probability expressed in percent.
    #[must_use]
    pub fn risk_score(&self) -> f64 {
        self.probability * 100.0
    }
}
