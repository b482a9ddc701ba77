//! The append-only log trait.

use crate::error::StorageResult;

/// One segment's worth of raw storage.
///
/// An `AppendLog` supports exactly what the store does to a segment file:
/// append a frame at the tail, read back a known byte range, cut off a torn
/// tail during recovery, and sync before sealing. Frames are opaque here;
/// framing and indexing live above.
///
/// ## Write discipline
///
/// There is no interior mutability and no locking in a log. All mutation
/// goes through `&mut self`, so the borrow checker enforces the store's
/// single-writer rule; any number of positional reads may run concurrently
/// through `&self`. The segment layer wraps a log in its own lock and
/// hands out read access to concurrent getters.
///
/// ## Offsets
///
/// `append` hands out the offset a frame starts at, and that offset stays
/// valid for the lifetime of the log: nothing is ever moved or overwritten,
/// and `truncate` only discards a tail no offset has been handed out for.
pub trait AppendLog: Send + Sync {
    /// Fills `buf` with the bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` when `offset + buf.len()` reaches past [`len`]; `Io`
    /// on filesystem failure.
    ///
    /// [`len`]: AppendLog::len
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()>;

    /// Appends a frame at the tail and returns the offset it starts at.
    ///
    /// # Errors
    ///
    /// `Io` on filesystem failure; the log length is unchanged on error.
    fn append(&mut self, frame: &[u8]) -> StorageResult<u64>;

    /// Length of the log in bytes; the offset the next `append` returns.
    fn len(&self) -> u64;

    /// Whether the log holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes all appended frames durable.
    ///
    /// # Errors
    ///
    /// `Io` on filesystem failure.
    fn sync(&mut self) -> StorageResult<()>;

    /// Discards everything from `offset` to the tail.
    ///
    /// Used once per log at most, when recovery finds a torn trailing
    /// frame; subsequent appends continue from `offset`.
    ///
    /// # Errors
    ///
    /// `TruncatePastEnd` when `offset` exceeds the current length; `Io` on
    /// filesystem failure.
    fn truncate(&mut self, offset: u64) -> StorageResult<()>;
}
