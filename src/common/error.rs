use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced by table operations.
///
/// Normalization never fails: unknown payload fields are dropped and
/// unrepresentable values degrade to text or null. Only predicate
/// evaluation and payload decoding can reach the caller as an error.
#[derive(Debug, Error, Diagnostic)]
pub enum TableError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
