//! Error types for ormscope-explain

use thiserror::Error;

/// Result type for ormscope-explain operations.
pub type ExplainResult<T> = Result<T, ExplainError>;

/// Error type for plan extraction and policy configuration.
///
/// Policy violations are not errors of this kind; see [`crate::Violation`].
#[derive(Debug, Error)]
pub enum ExplainError {
    /// A required plan column is absent from the tabular result.
    #[error("Missing plan column '{0}'")]
    MissingColumn(String),
    /// A row does not have as many cells as the header declares.
    #[error("Malformed plan row {row}: expected {expected} cells, got {got}")]
    RowShape {
        row: usize,
        expected: usize,
        got: usize,
    },
    /// A cell could not be converted to the column's type.
    #[error("Decode error for column '{column}': {message}")]
    Decode { column: String, message: String },
    /// An access-type token that is not one of the recognized levels.
    #[error("{0} is not valid type")]
    InvalidAccessType(String),
}

impl ExplainError {
    /// Create a decode error.
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        ExplainError::Decode {
            column: column.into(),
            message: message.into(),
        }
    }
}
