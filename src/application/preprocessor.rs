//! Preprocessor: turns a raw survey record into the classifier's input row.
//!
//! Pipeline:
//! 1. Reject the record if any selected feature is missing
//! 2. Project onto the selected features (extra keys are ignored)
//! 3. Encode categorical columns, scale continuous columns
//! 4. Reindex the concatenated sub-vectors into `selected` order
//!
//! Step 4 is what keeps the columns aligned with the order the model was
//! fitted on; the two sub-vectors are generally interleaved in that order.

use std::collections::HashMap;

use crate::domain::{EncodedVector, FeatureSet, RawRecord};
use crate::ports::{CategoricalEncoder, ContinuousScaler, TransformError};

/// Errors raised while preprocessing a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreprocessError {
    #[error("Missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    #[error("Encoding failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Transform returned {got} columns for {expected} inputs")]
    TransformWidth { expected: usize, got: usize },

    #[error("No fitted transform for features: {}", .0.join(", "))]
    UnencodedColumns(Vec<String>),
}

impl PreprocessError {
    /// Identifiers missing from the record, if that is the failure.
    #[must_use]
    pub fn missing_features(&self) -> Option<&[String]> {
        match self {
            Self::MissingFeatures(ids) => Some(ids),
            _ => None,
        }
    }
}

/// Encode `raw` into a vector ordered like `features.selected()`.
///
/// A transform that is not configured, or a kind with no columns, yields an
/// empty sub-vector; any selected column left without an encoded value then
/// fails the reindex step.
///
/// # Errors
/// - `MissingFeatures` listing every absent identifier, before any transform
/// - `Transform` / `TransformWidth` if a fitted transform rejects the row
/// - `UnencodedColumns` if a selected column has no encoded value
pub fn encode(
    raw: &RawRecord,
    features: &FeatureSet,
    encoder: Option<&dyn CategoricalEncoder>,
    scaler: Option<&dyn ContinuousScaler>,
) -> Result<EncodedVector, PreprocessError> {
    let missing: Vec<String> = features
        .selected()
        .iter()
        .filter(|id| !raw.contains(id))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(PreprocessError::MissingFeatures(missing));
    }

    let projected: HashMap<&str, f64> = features
        .selected()
        .iter()
        .filter_map(|id| raw.get(id).map(|v| (id.as_str(), v)))
        .collect();
    let column = |ids: &[String]| -> Vec<f64> {
        ids.iter().map(|id| projected[id.as_str()]).collect()
    };

    let categorical = match encoder {
        Some(encoder) if !features.categorical().is_empty() => {
            let ids = features.categorical();
            let encoded = encoder.transform(ids, &column(ids))?;
            check_width(ids.len(), encoded.len())?;
            ids.iter().zip(encoded).collect::<Vec<_>>()
        }
        _ => Vec::new(),
    };

    let continuous = match scaler {
        Some(scaler) if !features.continuous().is_empty() => {
            let ids = features.continuous();
            let scaled = scaler.transform(ids, &column(ids))?;
            check_width(ids.len(), scaled.len())?;
            ids.iter().zip(scaled).collect::<Vec<_>>()
        }
        _ => Vec::new(),
    };

    let combined: HashMap<&str, f64> = categorical
        .into_iter()
        .chain(continuous)
        .map(|(id, v)| (id.as_str(), v))
        .collect();

    let mut values = Vec::with_capacity(features.len());
    let mut unencoded = Vec::new();
    for id in features.selected() {
        match combined.get(id.as_str()) {
            Some(v) => values.push(*v),
            None => unencoded.push(id.clone()),
        }
    }
    if !unencoded.is_empty() {
        return Err(PreprocessError::UnencodedColumns(unencoded));
    }

    let raw_values = column(features.selected());
    EncodedVector::new(features.selected().to_vec(), values, raw_values).ok_or(
        PreprocessError::TransformWidth {
            expected: features.len(),
            got: combined.len(),
        },
    )
}

fn check_width(expected: usize, got: usize) -> Result<(), PreprocessError> {
    if expected != got {
        return Err(PreprocessError::TransformWidth { expected, got });
    }
    Ok(())
}
