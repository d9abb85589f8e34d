//! Error types for upform
//!
//! Provides a unified error type for policy, signing and session operations.

use thiserror::Error;

/// Result type alias for upform core operations
pub type Result<T> = std::result::Result<T, UpformError>;

/// Unified error type for upform core
#[derive(Error, Debug)]
pub enum UpformError {
    // ===== Validation Errors =====
    #[error("Signing key must not be empty")]
    EmptySecret,

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    // ===== Integrity Errors =====
    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    // ===== Session Errors =====
    #[error("Malformed session status: {0}")]
    MalformedSession(String),

    #[error("Session reports {reported} blocks, expected {expected}")]
    BlockCountMismatch { reported: u64, expected: u64 },

    // ===== I/O Errors =====
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Serialization Errors =====
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for UpformError {
    fn from(err: serde_json::Error) -> Self {
        UpformError::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for UpformError {
    fn from(err: base64::DecodeError) -> Self {
        UpformError::Serialization(err.to_string())
    }
}
