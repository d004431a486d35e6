//! Error types for the gaze pursuit engine

use thiserror::Error;

/// Errors that can occur while configuring a detector or loading gaze traces.
///
/// The classification path itself is infallible: degenerate geometry yields
/// sentinel statistics rather than errors.
#[derive(Debug, Error)]
pub enum PursuitError {
    #[error("Failed to parse gaze trace: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid trace event at index {index}: {reason}")]
    InvalidEvent { index: usize, reason: String },

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
