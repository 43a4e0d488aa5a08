//! Fitted preprocessing transforms exported from scikit-learn.
//!
//! - `OrdinalEncoder`: maps each categorical code to its index in the fitted
//!   category list
//! - `StandardScaler`: `(x - mean) / scale` per column
//!
//! Both deserialize from the JSON exported alongside the model and are
//! checked with `validate()` before use.

use serde::{Deserialize, Serialize};

use crate::ports::{CategoricalEncoder, ContinuousScaler, TransformError};

fn check_width(expected: usize, columns: &[String], values: &[f64]) -> Result<(), TransformError> {
    if values.len() != expected || columns.len() != expected {
        return Err(TransformError::WidthMismatch {
            expected,
            got: values.len().max(columns.len()),
        });
    }
    Ok(())
}

/// Ordinal encoder fitted per categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    /// Known categories per column, in encoding order.
    pub categories: Vec<Vec<f64>>,

    /// Code emitted for unseen categories; unseen categories are an error
    /// when absent.
    #[serde(default)]
    pub unknown_value: Option<f64>,
}

impl OrdinalEncoder {
    /// Sanity-check fitted parameters.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        for (i, cats) in self.categories.iter().enumerate() {
            if cats.is_empty() {
                return Err(format!("column {i} has no categories"));
            }
            if cats.iter().any(|c| !c.is_finite()) {
                return Err(format!("column {i} has a non-finite category"));
            }
            for (j, c) in cats.iter().enumerate() {
                if cats[..j].contains(c) {
                    return Err(format!("column {i} repeats category {c}"));
                }
            }
        }
        Ok(())
    }
}

impl CategoricalEncoder for OrdinalEncoder {
    fn width(&self) -> usize {
        self.categories.len()
    }

    fn transform(&self, columns: &[String], values: &[f64]) -> Result<Vec<f64>, TransformError> {
        check_width(self.width(), columns, values)?;

        self.categories
            .iter()
            .zip(columns.iter().zip(values))
            .map(|(cats, (column, &value))| {
                match cats.iter().position(|&c| c == value) {
                    Some(index) => Ok(index as f64),
                    None => self.unknown_value.ok_or_else(|| TransformError::UnknownCategory {
                        column: column.clone(),
                        value,
                    }),
                }
            })
            .collect()
    }
}

/// Standard scaler fitted per continuous column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Sanity-check fitted parameters.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err("mean contains a non-finite value".into());
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err("scale must be finite and > 0".into());
        }
        Ok(())
    }
}

impl ContinuousScaler for StandardScaler {
    fn width(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, columns: &[String], values: &[f64]) -> Result<Vec<f64>, TransformError> {
        check_width(self.width(), columns, values)?;

        columns
            .iter()
            .zip(values)
            .zip(self.mean.iter().zip(&self.scale))
            .map(|((column, &value), (mean, scale))| {
                if value.is_finite() {
                    Ok((value - mean) / scale)
                } else {
                    Err(TransformError::NonFinite {
                        column: column.clone(),
                        value,
                    })
                }
            })
            .collect()
    }
}
