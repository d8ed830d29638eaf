//! Error types for ensemble-core

use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Empty measurement name")]
    EmptyMeasurement,

    #[error("Empty tag key")]
    EmptyTagKey,

    #[error("Empty value for tag {0}")]
    EmptyTagValue(String),

    #[error("Line break in {0}")]
    LineBreak(&'static str),

    #[error("Empty field key")]
    EmptyFieldKey,

    #[error("No fields provided")]
    NoFields,

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error(transparent)]
    Interrupted(#[from] crate::context::Interrupted),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
