//! Core error types for pomo-core.
//!
//! The hierarchy mirrors the layers of the crate: [`RepositoryError`] for
//! the storage backends, [`ConfigError`] for the settings file, and
//! [`CoreError`] for the interval engine itself.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::IntervalId;

/// Core error type for pomo-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A repository call failed while performing `context`.
    #[error("{context}: {source}")]
    Repository {
        context: &'static str,
        #[source]
        source: RepositoryError,
    },

    /// `pause` was called on an interval that is not running.
    #[error("interval {id} is not running")]
    IntervalNotRunning { id: IntervalId },

    /// `start` was called on an interval that is `Done` or `Cancelled`.
    #[error("interval {id} has already finished")]
    AlreadyFinished { id: IntervalId },

    /// The cancellation token fired while the interval was running.
    #[error("interval {id} was cancelled")]
    Cancelled { id: IntervalId },

    /// Another driver holds the interval's lease.
    #[error("interval {id} is being driven by another caller")]
    Leased { id: IntervalId },
}

impl CoreError {
    pub(crate) fn repository(context: &'static str, source: RepositoryError) -> Self {
        CoreError::Repository { context, source }
    }

    /// The underlying repository error, if this error came from the store.
    pub fn repository_error(&self) -> Option<&RepositoryError> {
        match self {
            CoreError::Repository { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True when the error is (or wraps) a repository `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self.repository_error(), Some(RepositoryError::NotFound(_)))
    }
}

/// Errors raised by [`Repository`](crate::storage::Repository) implementations.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// No interval is stored under the given id.
    #[error("interval {0} not found")]
    NotFound(IntervalId),

    /// The store is empty.
    #[error("no intervals stored")]
    NoIntervals,

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

    /// A stored row could not be decoded into an interval.
    #[error("Corrupt record for interval {id}: {message}")]
    Corrupt { id: IntervalId, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A thread panicked while holding the store's lock.
    #[error("repository lock poisoned")]
    Poisoned,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// The configuration directory could not be determined or created.
    #[error("Configuration directory unavailable: {0}")]
    DataDir(#[from] std::io::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                RepositoryError::Locked
            }
            _ => RepositoryError::QueryFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for RepositoryError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        RepositoryError::Poisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
