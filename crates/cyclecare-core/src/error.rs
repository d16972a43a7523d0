//! Core error types for cyclecare-core.
//!
//! This module defines the error hierarchy using thiserror. Nothing in the
//! engine is fatal: invalid input is rejected up front, backend and storage
//! failures degrade to fewer notifications or stale gating.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for cyclecare-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed cycle statistics. Rejected before scheduling, never retried.
    #[error("Invalid cycle profile: {0}")]
    InvalidProfile(String),

    /// Bad forecast or scheduling parameters.
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument { field: String, message: String },

    /// Notification backend call failed (transient).
    #[error("Notification backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    /// Persistence read/write failure.
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_argument(field: &str, message: impl Into<String>) -> Self {
        CoreError::InvalidArgument {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Whether a caller-driven retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::BackendUnavailable(_) | CoreError::StorageFailure(_)
        )
    }
}

/// Errors reported by a notification backend for a single operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached at all.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The backend refused a specific notification.
    #[error("notification '{id}' rejected: {message}")]
    Rejected { id: String, message: String },
}

/// Key-value persistence errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Read failed
    #[error("Failed to read key '{key}': {message}")]
    ReadFailed { key: String, message: String },

    /// Write failed
    #[error("Failed to write key '{key}': {message}")]
    WriteFailed { key: String, message: String },

    /// Stored value could not be decoded
    #[error("Corrupt value for key '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// Store is locked
    #[error("Store is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl StorageError {
    pub(crate) fn read(key: &str, err: impl std::fmt::Display) -> Self {
        StorageError::ReadFailed {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn write(key: &str, err: impl std::fmt::Display) -> Self {
        StorageError::WriteFailed {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
