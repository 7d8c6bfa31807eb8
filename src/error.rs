//! Error types for Lecture Flux

use thiserror::Error;

/// Errors that can occur during feature computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse event table: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required column(s) for {feature}: {columns}")]
    MissingColumns { feature: String, columns: String },

    #[error("Division by zero in {0}: the event table has no actions")]
    DivisionByZero(String),

    #[error("Feature {0} is not supported by the generic dispatcher")]
    UnsupportedFeature(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Course schedule required by {0} was not supplied")]
    MissingSchedule(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
