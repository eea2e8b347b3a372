//! Error types for the waste-sorter library.
//!
//! This module provides custom error types using `thiserror` for the record
//! store, configuration and identity boundary. Classification and upload
//! validation failures have their own types in `classifier` and `validation`
//! because they are expected outcomes rather than faults.

use thiserror::Error;

/// Errors that can occur in the waste-sorter application.
#[derive(Error, Debug)]
pub enum WasteSorterError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A classification referenced a user id that is not in the store
    #[error("Unknown user id: {0}")]
    UnknownUser(i64),

    /// A classification record violated a field invariant
    #[error("Invalid classification record: {0}")]
    InvalidRecord(String),

    /// A stored label is not one of the known categories
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Identity provider exchange failed
    #[error("Identity provider error: {0}")]
    Identity(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with `WasteSorterError`
pub type Result<T> = std::result::Result<T, WasteSorterError>;

impl From<anyhow::Error> for WasteSorterError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<reqwest::Error> for WasteSorterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Identity(err.to_string())
    }
}
