//! Core error types for habitsync-core.
//!
//! Each concern owns a thiserror enum; [`CoreError`] aggregates them so
//! callers that do not care about the concern can use `?` throughout.

use std::path::PathBuf;
use thiserror::Error;

use crate::auth::AuthError;
use crate::sync::TransportError;

/// Core error type for habitsync-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Durable cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Credential errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Remote store errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Document edit errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Durable cache errors.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to open the backing database
    #[error("Failed to open cache at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Backing store is locked by another process
    #[error("Cache is locked")]
    Locked,

    /// File-backed slot IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Document edit errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Name empty after sanitizing
    #[error("Habit name cannot be empty")]
    EmptyName,

    /// No habit with the given id
    #[error("Habit not found: {0}")]
    HabitNotFound(String),

    /// The document must keep at least one habit
    #[error("At least one habit is required")]
    LastHabit,

    /// Malformed date key
    #[error("Invalid date key '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    CacheError::Locked
                } else {
                    CacheError::QueryFailed(err.to_string())
                }
            }
            _ => CacheError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
