//! Ordered feature selection required by a fitted model.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Errors raised when a feature selection violates its invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeatureSetError {
    #[error("Feature set is empty")]
    Empty,

    #[error("Duplicate feature identifier: {0}")]
    Duplicate(String),

    #[error("Feature {0} is listed as both categorical and continuous")]
    Overlap(String),

    #[error("Feature {0} is not part of selected_features")]
    Unselected(String),

    #[error("Features without a kind: {}", .0.join(", "))]
    Unclassified(Vec<String>),
}

/// The ordered feature selection a model was fitted on.
///
/// `selected` is the column order of every encoded vector. The categorical and
/// continuous sub-sequences are disjoint and together cover `selected`
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FeatureSetFile", into = "FeatureSetFile")]
pub struct FeatureSet {
    selected: Vec<String>,
    categorical: Vec<String>,
    continuous: Vec<String>,
}

/// Wire layout of a feature selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeatureSetFile {
    selected_features: Vec<String>,
    #[serde(default)]
    selected_categorical: Vec<String>,
    #[serde(default)]
    selected_continuous: Vec<String>,
}

impl FeatureSet {
    /// Build a feature set, checking the partition invariants.
    ///
    /// # Errors
    /// Returns an error if identifiers repeat, overlap between kinds, appear
    /// in a sub-sequence without being selected, or are left without a kind.
    pub fn new(
        selected: Vec<String>,
        categorical: Vec<String>,
        continuous: Vec<String>,
    ) -> Result<Self, FeatureSetError> {
        if selected.is_empty() {
            return Err(FeatureSetError::Empty);
        }

        let mut seen = HashSet::with_capacity(selected.len());
        for id in &selected {
            if !seen.insert(id.as_str()) {
                return Err(FeatureSetError::Duplicate(id.clone()));
            }
        }

        let mut classified = HashSet::with_capacity(selected.len());
        for id in categorical.iter().chain(continuous.iter()) {
            if !seen.contains(id.as_str()) {
                return Err(FeatureSetError::Unselected(id.clone()));
            }
            if !classified.insert(id.as_str()) {
                return Err(if categorical.contains(id) && continuous.contains(id) {
                    FeatureSetError::Overlap(id.clone())
                } else {
                    FeatureSetError::Duplicate(id.clone())
                });
            }
        }

        let unclassified: Vec<String> = selected
            .iter()
            .filter(|id| !classified.contains(id.as_str()))
            .cloned()
            .collect();
        if !unclassified.is_empty() {
            return Err(FeatureSetError::Unclassified(unclassified));
        }

        Ok(Self {
            selected,
            categorical,
            continuous,
        })
    }

    /// Column order of the encoded vector.
    #[must_use]
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    #[must_use]
    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    #[must_use]
    pub fn continuous(&self) -> &[String] {
        &self.continuous
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    /// Column index of a feature in the encoded vector.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.selected.iter().position(|s| s == id)
    }
}

impl TryFrom<FeatureSetFile> for FeatureSet {
    type Error = FeatureSetError;

    fn try_from(file: FeatureSetFile) -> Result<Self, Self::Error> {
        Self::new(
            file.selected_features,
            file.selected_categorical,
            file.selected_continuous,
        )
    }
}

impl From<FeatureSet> for FeatureSetFile {
    fn from(set: FeatureSet) -> Self {
        Self {
            selected_features: set.selected,
            selected_categorical: set.categorical,
            selected_continuous: set.continuous,
        }
    }
}
