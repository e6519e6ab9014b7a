//! Unified error types for Lexis.
//!
//! The engine itself is almost entirely infallible: queue building degrades
//! to an empty queue and stat recomputation is pure arithmetic. Errors come
//! from the edges (stores, config files, caller-level validation) and are
//! propagated to the caller so a failed commit can be retried.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Lexis operations.
#[derive(Error, Debug)]
pub enum LexisError {
    /// I/O errors from file-backed stores.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A store collaborator failed or is unavailable.
    #[error("store error: {message}")]
    Store { message: String },

    /// JSON serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Session lifecycle violations (e.g. completing an abandoned session).
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// Item not found in the item store.
    #[error("item not found: {item_id}")]
    ItemNotFound { item_id: String },

    /// Table not found in the item store.
    #[error("table not found: {table_id}")]
    TableNotFound { table_id: String },

    /// Rejected input: schema violations, duplicate keywords, short sessions.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for Lexis operations.
pub type Result<T> = std::result::Result<T, LexisError>;

impl LexisError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an item not found error.
    pub fn item_not_found(item_id: impl Into<String>) -> Self {
        Self::ItemNotFound {
            item_id: item_id.into(),
        }
    }

    /// Create a table not found error.
    pub fn table_not_found(table_id: impl Into<String>) -> Self {
        Self::TableNotFound {
            table_id: table_id.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation may succeed.
    ///
    /// Store and storage failures are transient from the engine's point of
    /// view; validation and state errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Store { .. })
    }
}

impl From<io::Error> for LexisError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for LexisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling on non-critical reads.
///
/// Used where a missing log or config file should degrade to a default
/// instead of aborting the caller.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the Lexis CLI.
pub mod exit_codes {
    /// Command succeeded.
    pub const SUCCESS: i32 = 0;

    /// Command failed.
    pub const ERROR: i32 = 1;

    /// Process panicked.
    pub const CRASH: i32 = 3;
}
