//! Static survey feature metadata.
//!
//! The catalog describes every survey item the deployed questionnaire can
//! collect: its semantic kind, valid domain, form label and the short display
//! name used in explanations. It is built once per process and shared
//! read-only by all requests.

use std::sync::OnceLock;

use serde::Serialize;

use super::{FeatureSet, RawRecord};

static STANDARD_CATALOG: OnceLock<FeatureCatalog> = OnceLock::new();

/// Semantic kind of a survey feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Categorical,
    Continuous,
}

/// Form section a feature is rendered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum FeatureSection {
    BasicInformation,
    HealthStatus,
    FunctionalAssessment,
    SubjectiveEvaluation,
    FamilyInformation,
}

impl FeatureSection {
    /// All sections in form order.
    pub const ALL: [FeatureSection; 5] = [
        Self::BasicInformation,
        Self::HealthStatus,
        Self::FunctionalAssessment,
        Self::SubjectiveEvaluation,
        Self::FamilyInformation,
    ];

    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::BasicInformation => "Basic Information",
            Self::HealthStatus => "Health Status",
            Self::FunctionalAssessment => "Functional Assessment",
            Self::SubjectiveEvaluation => "Subjective Evaluation",
            Self::FamilyInformation => "Family Information",
        }
    }
}

/// Valid values for a feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureDomain {
    /// Enumerated numeric codes with their display labels, in form order.
    Codes { codes: Vec<(f64, &'static str)> },

    /// Closed numeric range with an input granularity.
    Range { min: f64, max: f64, step: f64 },
}

impl FeatureDomain {
    /// Check whether `value` is admissible in this domain.
    #[must_use]
    pub fn admits(&self, value: f64) -> bool {
        match self {
            Self::Codes { codes } => codes.iter().any(|(code, _)| *code == value),
            Self::Range { min, max, step } => {
                if !(*min..=*max).contains(&value) {
                    return false;
                }
                // Accept values on the step grid, allowing for float noise.
                let steps = (value - min) / step;
                (steps - steps.round()).abs() < 1e-9
            }
        }
    }

    /// Display label for a categorical code.
    #[must_use]
    pub fn code_label(&self, value: f64) -> Option<&'static str> {
        match self {
            Self::Codes { codes } => codes
                .iter()
                .find(|(code, _)| *code == value)
                .map(|(_, label)| *label),
            Self::Range { .. } => None,
        }
    }
}

/// Metadata for one survey feature.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSpec {
    /// Identifier used in raw records and model artifacts.
    pub id: &'static str,

    /// Form label.
    pub label: &'static str,

    /// Short name used in explanation labels.
    pub short_label: &'static str,

    pub kind: FeatureKind,
    pub section: FeatureSection,
    pub domain: FeatureDomain,
}

impl FeatureSpec {
    fn categorical(
        id: &'static str,
        label: &'static str,
        short_label: &'static str,
        section: FeatureSection,
        codes: &[(f64, &'static str)],
    ) -> Self {
        Self {
            id,
            label,
            short_label,
            kind: FeatureKind::Categorical,
            section,
            domain: FeatureDomain::Codes { codes: codes.to_vec() },
        }
    }

    fn continuous(
        id: &'static str,
        label: &'static str,
        short_label: &'static str,
        section: FeatureSection,
        min: f64,
        max: f64,
        step: f64,
    ) -> Self {
        Self {
            id,
            label,
            short_label,
            kind: FeatureKind::Continuous,
            section,
            domain: FeatureDomain::Range { min, max, step },
        }
    }
}

/// The full set of known survey features.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureCatalog {
    specs: Vec<FeatureSpec>,
}

impl FeatureCatalog {
    /// Build a catalog from explicit specs.
    #[must_use]
    pub fn new(specs: Vec<FeatureSpec>) -> Self {
        Self { specs }
    }

    /// The catalog of the deployed questionnaire, built on first use.
    pub fn standard() -> &'static FeatureCatalog {
        STANDARD_CATALOG.get_or_init(|| Self::new(standard_specs()))
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FeatureSpec> {
        self.specs.iter().find(|spec| spec.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureSpec> {
        self.specs.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Short display name for a feature, falling back to the raw identifier.
    #[must_use]
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map_or(id, |spec| spec.short_label)
    }

    /// Validate every catalogued value present in `raw` against its domain.
    ///
    /// Identifiers unknown to the catalog are not checked.
    ///
    /// # Errors
    /// Returns every violation found, one message per feature.
    pub fn validate(&self, raw: &RawRecord) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (id, value) in raw.iter() {
            let Some(spec) = self.get(id) else {
                continue;
            };
            if !spec.domain.admits(value) {
                let message = match &spec.domain {
                    FeatureDomain::Codes { codes } => {
                        let allowed: Vec<String> =
                            codes.iter().map(|(code, _)| format!("{code}")).collect();
                        format!("{} {} must be one of [{}]", spec.label, value, allowed.join(", "))
                    }
                    FeatureDomain::Range { min, max, step } => format!(
                        "{} {} out of range [{}, {}] with step {}",
                        spec.label, value, min, max, step
                    ),
                };
                errors.push(message);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Selected features grouped by form section, in catalog order.
    ///
    /// Sections with no selected feature are omitted; selected features the
    /// catalog does not know are not rendered.
    #[must_use]
    pub fn sections(&self, features: &FeatureSet) -> Vec<(FeatureSection, Vec<&FeatureSpec>)> {
        FeatureSection::ALL
            .iter()
            .filter_map(|section| {
                let specs: Vec<&FeatureSpec> = self
                    .specs
                    .iter()
                    .filter(|spec| spec.section == *section && features.contains(spec.id))
                    .collect();
                (!specs.is_empty()).then_some((*section, specs))
            })
            .collect()
    }
}

const NO_YES: [(f64, &str); 2] = [(0.0, "No"), (1.0, "Yes")];

fn standard_specs() -> Vec<FeatureSpec> {
    use FeatureSection::*;

    vec![
        FeatureSpec::categorical(
            "gender",
            "Gender",
            "Gender",
            BasicInformation,
            &[(0.0, "Female"), (1.0, "Male")],
        ),
        FeatureSpec::continuous("age", "Age", "Age", BasicInformation, 45.0, 120.0, 1.0),
        FeatureSpec::categorical(
            "education",
            "Education Level",
            "Education",
            BasicInformation,
            &[
                (1.0, "Below Middle School"),
                (2.0, "High School/Vocational"),
                (3.0, "Higher Education"),
            ],
        ),
        FeatureSpec::categorical("smoke", "Smoking", "Smoking", HealthStatus, &NO_YES),
        FeatureSpec::categorical(
            "digeste",
            "Digestive Disease",
            "Digestive Disease",
            HealthStatus,
            &NO_YES,
        ),
        FeatureSpec::categorical("lunge", "Lung Disease", "Lung Disease", HealthStatus, &NO_YES),
        FeatureSpec::categorical("arthre", "Arthritis", "Arthritis", HealthStatus, &NO_YES),
        FeatureSpec::continuous(
            "chronum",
            "Number of Comorbid Conditions",
            "Chronic Conditions",
            HealthStatus,
            0.0,
            14.0,
            1.0,
        ),
        FeatureSpec::continuous(
            "adl",
            "ADL Score",
            "ADL Score",
            FunctionalAssessment,
            0.0,
            6.0,
            1.0,
        ),
        FeatureSpec::continuous(
            "iadl",
            "IADL Score",
            "IADL Score",
            FunctionalAssessment,
            0.0,
            5.0,
            1.0,
        ),
        FeatureSpec::continuous(
            "cog",
            "Cognitive Function Score",
            "Cognitive Function",
            FunctionalAssessment,
            0.0,
            21.0,
            0.5,
        ),
        FeatureSpec::continuous(
            "cesd",
            "CESD Depression Score",
            "Depression Score",
            FunctionalAssessment,
            0.0,
            30.0,
            1.0,
        ),
        FeatureSpec::categorical(
            "selfhealth",
            "Self-rated Health",
            "Self-rated Health",
            SubjectiveEvaluation,
            &[
                (1.0, "Very Poor"),
                (2.0, "Poor"),
                (3.0, "Fair"),
                (4.0, "Good"),
                (5.0, "Very Good"),
            ],
        ),
        FeatureSpec::categorical(
            "lonely",
            "Loneliness Frequency",
            "Loneliness",
            SubjectiveEvaluation,
            &[(1.0, "Rarely"), (2.0, "Sometimes"), (3.0, "Often"), (4.0, "Always")],
        ),
        FeatureSpec::categorical(
            "lifesat",
            "Life Satisfaction",
            "Life Satisfaction",
            SubjectiveEvaluation,
            &[
                (5.0, "Extremely Satisfied"),
                (4.0, "Very Satisfied"),
                (3.0, "Somewhat Satisfied"),
                (2.0, "Not Very Satisfied"),
                (1.0, "Not at All Satisfied"),
            ],
        ),
        FeatureSpec::continuous(
            "hchild",
            "Number of Living Children",
            "Number of Children",
            FamilyInformation,
            0.0,
            20.0,
            1.0,
        ),
    ]
}
