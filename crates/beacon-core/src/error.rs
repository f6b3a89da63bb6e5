//! Error types for the beacon system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for beacon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the beacon system
#[derive(Error, Debug)]
pub enum Error {
    /// Local identity could not be resolved (hostname or IP unavailable).
    /// Retried at the retry interval, never abandoned.
    #[error("identity resolution error: {0}")]
    Resolution(String),

    /// Report delivery failed (collector rejected the report or was
    /// unreachable). Retried per the failure-window state machine.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed inbound report. Rejected immediately, not retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Collector persistence failure. The report is not considered
    /// delivered and no partial record is stored.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an identity resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
