//! Fitted preprocessing ports: categorical encoder and continuous scaler.
//!
//! Both transforms see only their own columns, in the order the feature set
//! declares them, and return a sub-vector of the same width.

/// Errors raised by a fitted transform.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("Transform fitted on {expected} columns, got {got}")]
    WidthMismatch { expected: usize, got: usize },

    #[error("Unknown category {value} for feature {column}")]
    UnknownCategory { column: String, value: f64 },

    #[error("Non-finite value {value} for feature {column}")]
    NonFinite { column: String, value: f64 },
}

/// Fitted encoder for categorical columns.
pub trait CategoricalEncoder: Send + Sync {
    /// Number of columns the encoder was fitted on.
    fn width(&self) -> usize;

    /// Encode one row.
    ///
    /// # Arguments
    /// * `columns` - Feature identifiers, used for error reporting
    /// * `values` - Raw categorical codes, aligned with `columns`
    ///
    /// # Errors
    /// Returns `TransformError` on a width mismatch or an unseen category.
    fn transform(&self, columns: &[String], values: &[f64]) -> Result<Vec<f64>, TransformError>;
}

/// Fitted scaler for continuous columns.
pub trait ContinuousScaler: Send + Sync {
    /// Number of columns the scaler was fitted on.
    fn width(&self) -> usize;

    /// Scale one row.
    ///
    /// # Errors
    /// Returns `TransformError` on a width mismatch or a non-finite value.
    fn transform(&self, columns: &[String], values: &[f64]) -> Result<Vec<f64>, TransformError>;
}
