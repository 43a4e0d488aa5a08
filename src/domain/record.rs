//! Per-request input and encoded model input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Survey answers keyed by feature identifier.
///
/// Categorical answers arrive as their canonical numeric code
/// (e.g. `gender = 1.0` for "Male"). Extra keys are allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    values: BTreeMap<String, f64>,
}

impl RawRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(id, value)` pairs.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Set a value, returning the previous one.
    pub fn insert(&mut self, id: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(id.into(), value)
    }

    pub fn remove(&mut self, id: &str) -> Option<f64> {
        self.values.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<f64> {
        self.values.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Numeric model input, one column per selected feature.
///
/// Column order always equals the feature set's `selected` order. The raw
/// (pre-encoding) values are kept alongside, in the same order, so that
/// explanations can show what the subject actually answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedVector {
    columns: Vec<String>,
    values: Vec<f64>,
    raw: Vec<f64>,
}

impl EncodedVector {
    /// Assemble an encoded vector from aligned columns.
    ///
    /// Returns `None` if the three sequences differ in length.
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<f64>, raw: Vec<f64>) -> Option<Self> {
        (columns.len() == values.len() && values.len() == raw.len()).then_some(Self {
            columns,
            values,
            raw,
        })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Encoded values as seen by the classifier.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Raw values in column order.
    #[must_use]
    pub fn raw_values(&self) -> &[f64] {
        &self.raw
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
