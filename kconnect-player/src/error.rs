//! Error types for kconnect-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use crate::api::ApiError;
use thiserror::Error;

/// Main error type for the playback core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend request failed
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Audio output handle errors (rejected play, bad source)
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Persisted session could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Shared library error
    #[error(transparent)]
    Common(#[from] kconnect_common::Error),
}

/// Convenience Result type using kconnect-player Error
pub type Result<T> = std::result::Result<T, Error>;
