//! In-memory log for tests.

use crate::error::{StorageError, StorageResult};
use crate::log::AppendLog;

/// An append-only log over a plain byte vector.
///
/// Used by segment and compaction tests that don't care about disk, and by
/// recovery tests that want to hand the segment layer a pre-built run of
/// frames (torn tails included) via [`MemoryLog::with_frames`]. Like every
/// log it carries no locking; `&mut` is the write permission.
#[derive(Debug, Default)]
pub struct MemoryLog {
    data: Vec<u8>,
}

impl MemoryLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log holding `data` as if it had been appended earlier.
    ///
    /// Recovery tests use this to simulate what a crash left on disk.
    #[must_use]
    pub fn with_frames(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// The full contents, for assertions on exact byte layout.
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl AppendLog for MemoryLog {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        let len = self.len();
        let end = offset.saturating_add(buf.len() as u64);

        if end > len {
            return Err(StorageError::OutOfBounds {
                offset,
                requested: buf.len(),
                len,
            });
        }

        let start = offset as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn append(&mut self, frame: &[u8]) -> StorageResult<u64> {
        let offset = self.len();
        self.data.extend_from_slice(frame);
        Ok(offset)
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, offset: u64) -> StorageResult<()> {
        if offset > self.len() {
            return Err(StorageError::TruncatePastEnd {
                offset,
                len: self.len(),
            });
        }

        self.data.truncate(offset as usize);
        Ok(())
    }
}
