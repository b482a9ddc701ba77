//! Error types for log storage.

use std::io;
use thiserror::Error;

/// Result type for log operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors a log can produce.
///
/// Out-of-range offsets get their own variants rather than an opaque I/O
/// error: the store distinguishes "the frame I indexed is gone" (a
/// corruption signal) from a plain filesystem failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A positional read reached past the end of the log.
    #[error("read of {requested} bytes at offset {offset} past log end {len}")]
    OutOfBounds {
        /// Offset the read started at.
        offset: u64,
        /// Bytes the caller asked for.
        requested: usize,
        /// Length of the log.
        len: u64,
    },

    /// Torn-tail repair asked to cut the log beyond its end.
    #[error("truncate at offset {offset} past log end {len}")]
    TruncatePastEnd {
        /// Offset the truncation was requested at.
        offset: u64,
        /// Length of the log.
        len: u64,
    },
}
