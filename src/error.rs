//! Crate-wide error types

use thiserror::Error;

/// Errors produced by the detection engine
#[derive(Debug, Error)]
pub enum NetsenseError {
    /// No trained model is available; train or load one first
    #[error("model not ready: {0}")]
    ModelNotReady(String),

    /// Input features do not match the schema the model was trained on
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Explanation requested but the model carries no training baseline
    #[error("explanation unavailable: {0}")]
    ExplainUnavailable(String),

    /// Invalid caller-supplied parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Data-level failure (IO, malformed dataset, missing artifact)
    #[error("data error: {0}")]
    DataError(String),

    /// Serialization or deserialization failure
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, NetsenseError>;
