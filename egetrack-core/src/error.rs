//! Error types for egetrack-core

use thiserror::Error;

/// Main error type for the egetrack-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected before persistence
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Profile not found
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// Task not found
    #[error("task not found: {0}")]
    TaskNotFound(i64),

    /// Day not found
    #[error("day not found: {0}")]
    DayNotFound(i64),

    /// Todo item not found
    #[error("todo item not found: {0}")]
    TodoNotFound(i64),

    /// Stats row was modified by another writer between read and write
    #[error("concurrent stats update for profile: {0}")]
    ConcurrentUpdate(String),
}

impl Error {
    /// Shorthand for a validation failure on a named field.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for egetrack-core
pub type Result<T> = std::result::Result<T, Error>;
