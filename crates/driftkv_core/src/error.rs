//! Error types for the DriftKV store.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in DriftKV store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Log storage error.
    #[error("storage error: {0}")]
    Storage(#[from] driftkv_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A segment holds inconsistent framing.
    #[error("corruption: {message}")]
    Corruption {
        /// Description of the inconsistency.
        message: String,
    },

    /// The key has never been written.
    ///
    /// This is a semantic miss, not a failure; callers treat it as a
    /// normal outcome.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// The key that was looked up.
        key: String,
    },

    /// A single entry is larger than the configured segment size.
    #[error("entry of {size} bytes exceeds segment size {max}")]
    EntryTooLarge {
        /// Framed size of the rejected entry.
        size: u64,
        /// Configured maximum segment size.
        max: u64,
    },

    /// The store has been closed.
    #[error("store is closed")]
    StoreClosed,

    /// Another process holds the store directory lock.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument issue.
        message: String,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl StoreError {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates a not-found error for the given key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Whether this error is the semantic miss returned for unknown keys.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}
