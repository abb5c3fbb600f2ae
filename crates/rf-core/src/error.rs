//! Shared error types for ReelForge crates

use thiserror::Error;

/// Core error type, shared by crates that don't warrant their own error enum
#[derive(Error, Debug)]
pub enum RfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("State error: {0}")]
    State(String),
}

/// Result type alias
pub type RfResult<T> = Result<T, RfError>;
