//! Core error types for quadrodoro-core.
//!
//! Storage, configuration and validation failures are grouped under
//! [`CoreError`]. Timer precondition violations have their own type because
//! they are programming errors raised by the session timer, which has no
//! other fallible surface.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerState;

/// Core error type for quadrodoro-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Session timer misuse
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// A referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
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

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors raised by the task and log managers.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Text field is empty after trimming
    #[error("'{field}' must not be empty")]
    EmptyText { field: &'static str },

    /// Quadrant index outside 0..=3
    #[error("Invalid quadrant {0}: must be an integer between 0 and 3")]
    InvalidQuadrant(i64),

    /// Negative pomodoro estimate
    #[error("Estimated pomodoros must not be negative (got {0})")]
    NegativeEstimate(i64),

    /// Completed tasks are read-only
    #[error("Task {0} is completed and can no longer be modified")]
    TaskCompleted(i64),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// Trimmed text, or [`ValidationError::EmptyText`] if nothing is left.
pub(crate) fn non_empty<'s>(text: &'s str, field: &'static str) -> Result<&'s str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyText { field });
    }
    Ok(trimmed)
}

/// Errors raised by the session timer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The operation is not allowed in the timer's current state.
    #[error("cannot {operation} while the timer is {state}")]
    PreconditionViolation {
        operation: &'static str,
        state: TimerState,
    },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_violation_names_operation_and_state() {
        let err = TimerError::PreconditionViolation {
            operation: "change the duration",
            state: TimerState::Running,
        };
        assert_eq!(
            err.to_string(),
            "cannot change the duration while the timer is running"
        );
    }

    #[test]
    fn rusqlite_errors_map_to_query_failed() {
        let err: CoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::QueryFailed(_))
        ));
    }
}
