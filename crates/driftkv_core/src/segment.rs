//! Segments: append-only logs with in-memory key indexes.
//!
//! A segment is one `current-data<N>` file plus a map from key to the
//! offset of that key's most recent entry within the file. The active
//! segment accepts appends; sealed segments are immutable and their
//! indexes never change.
//!
//! Lock discipline: the log lock and the index lock are never held at the
//! same time. Appends write the frame first and publish the index entry
//! after, so a concurrent reader either misses the key or sees a fully
//! written entry. Reads against the log are positional and run in
//! parallel under the read guard.

use crate::entry::Entry;
use crate::error::{StoreError, StoreResult};
use driftkv_storage::AppendLog;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Information about one segment, as reported by the store.
#[derive(Debug, Clone)]
pub struct SegmentInfo {
    /// Numeric file suffix (monotonically assigned, never reused).
    pub id: u64,
    /// Whether this segment is sealed (immutable).
    pub sealed: bool,
    /// Current size in bytes.
    pub size: u64,
    /// Number of distinct keys indexed in this segment.
    pub key_count: usize,
}

/// One append-only segment and its key index.
pub(crate) struct Segment {
    id: u64,
    log: RwLock<Box<dyn AppendLog>>,
    index: RwLock<HashMap<String, u64>>,
    sealed: AtomicBool,
}

impl Segment {
    /// Wraps a log as an empty-indexed segment.
    ///
    /// The index starts empty even if the log holds frames; call
    /// [`Segment::rebuild_index`] to replay them.
    pub fn new(id: u64, log: Box<dyn AppendLog>) -> Self {
        Self {
            id,
            log: RwLock::new(log),
            index: RwLock::new(HashMap::new()),
            sealed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Current log length in bytes.
    pub fn size(&self) -> u64 {
        self.log.read().len()
    }

    pub fn info(&self) -> SegmentInfo {
        SegmentInfo {
            id: self.id,
            sealed: self.is_sealed(),
            size: self.size(),
            key_count: self.index.read().len(),
        }
    }

    /// Syncs and marks the segment immutable.
    pub fn seal(&self) -> StoreResult<()> {
        self.log.write().sync()?;
        self.sealed.store(true, Ordering::Release);
        Ok(())
    }

    /// Appends one entry and publishes its index mapping.
    ///
    /// Returns the offset at which the entry's frame begins. The caller
    /// (the store's writer) guarantees the segment is still active.
    pub fn append(&self, entry: &Entry) -> StoreResult<u64> {
        let encoded = entry.encode();

        let offset = self.log.write().append(&encoded)?;
        self.index.write().insert(entry.key.clone(), offset);
        Ok(offset)
    }

    /// Syncs appended entries to durable storage.
    pub fn sync(&self) -> StoreResult<()> {
        self.log.write().sync()?;
        Ok(())
    }

    /// Returns the offset of the most recent entry for `key`, if indexed.
    pub fn lookup(&self, key: &str) -> Option<u64> {
        self.index.read().get(key).copied()
    }

    /// Whether this segment's index holds `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.index.read().contains_key(key)
    }

    /// All keys indexed in this segment.
    pub fn keys(&self) -> Vec<String> {
        self.index.read().keys().cloned().collect()
    }

    pub fn key_count(&self) -> usize {
        self.index.read().len()
    }

    /// Reads and decodes the frame starting at `offset`.
    ///
    /// Returns the entry and the frame's total length.
    pub fn read_frame_at(&self, offset: u64) -> StoreResult<(Entry, u64)> {
        let log = self.log.read();
        let len = log.len();

        if offset + 4 > len {
            return Err(StoreError::corruption(format!(
                "segment {}: offset {offset} beyond size {len}",
                self.id
            )));
        }

        let mut prefix = [0u8; 4];
        log.read_exact_at(offset, &mut prefix)?;
        let total = u64::from(Entry::frame_len(&prefix)?);

        if offset + total > len {
            return Err(StoreError::corruption(format!(
                "segment {}: frame at {offset} overruns size {len}",
                self.id
            )));
        }

        let mut frame = vec![0u8; total as usize];
        log.read_exact_at(offset, &mut frame)?;

        let entry = Entry::decode(&frame)?;
        Ok((entry, total))
    }

    /// Reads the entry whose frame starts at `offset`.
    pub fn read_at(&self, offset: u64) -> StoreResult<Entry> {
        self.read_frame_at(offset).map(|(entry, _)| entry)
    }

    /// Looks up `key` and reads its entry, if present.
    pub fn get(&self, key: &str) -> StoreResult<Option<Entry>> {
        match self.lookup(key) {
            Some(offset) => Ok(Some(self.read_at(offset)?)),
            None => Ok(None),
        }
    }

    /// Replays the log and rebuilds the index from scratch.
    ///
    /// Later entries for the same key overwrite earlier offsets. A torn
    /// trailing entry (end of log inside a frame) is truncated away so
    /// subsequent appends continue from a clean boundary; any other
    /// framing inconsistency is corruption.
    pub fn rebuild_index(&self) -> StoreResult<()> {
        let mut index = HashMap::new();
        let mut torn_at: Option<u64> = None;

        {
            let mut log = self.log.write();
            let len = log.len();
            let mut offset = 0u64;

            while offset < len {
                if offset + 4 > len {
                    torn_at = Some(offset);
                    break;
                }

                let mut prefix = [0u8; 4];
                log.read_exact_at(offset, &mut prefix)?;
                let total = u64::from(Entry::frame_len(&prefix)?);

                if offset + total > len {
                    torn_at = Some(offset);
                    break;
                }

                let mut frame = vec![0u8; total as usize];
                log.read_exact_at(offset, &mut frame)?;
                let entry = Entry::decode(&frame)?;
                index.insert(entry.key, offset);

                offset += total;
            }

            if let Some(boundary) = torn_at {
                tracing::warn!(
                    segment = self.id,
                    boundary,
                    dropped = len - boundary,
                    "truncating torn trailing entry"
                );
                log.truncate(boundary)?;
            }
        }

        *self.index.write() = index;
        Ok(())
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.id)
            .field("sealed", &self.is_sealed())
            .field("size", &self.size())
            .field("key_count", &self.key_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftkv_storage::MemoryLog;

    fn segment() -> Segment {
        Segment::new(0, Box::new(MemoryLog::new()))
    }

    fn entry(key: &str, value: &str) -> Entry {
        Entry::new(key, value).unwrap()
    }

    #[test]
    fn append_and_get() {
        let seg = segment();
        let e = entry("key1", "value1");

        let offset = seg.append(&e).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(seg.get("key1").unwrap(), Some(e));
        assert_eq!(seg.size(), 22);
    }

    #[test]
    fn get_missing_key() {
        let seg = segment();
        assert_eq!(seg.get("nope").unwrap(), None);
        assert_eq!(seg.lookup("nope"), None);
    }

    #[test]
    fn index_holds_latest_offset() {
        let seg = segment();
        seg.append(&entry("key1", "old")).unwrap();
        let second = seg.append(&entry("key1", "new")).unwrap();

        assert_eq!(seg.lookup("key1"), Some(second));
        assert_eq!(seg.get("key1").unwrap().unwrap().value, "new");
        assert_eq!(seg.key_count(), 1);
    }

    #[test]
    fn offsets_are_monotonic() {
        let seg = segment();
        let o1 = seg.append(&entry("a", "1")).unwrap();
        let o2 = seg.append(&entry("b", "22")).unwrap();
        let o3 = seg.append(&entry("c", "333")).unwrap();

        assert_eq!(o1, 0);
        assert_eq!(o2, 14); // 12 + 1 + 1
        assert_eq!(o3, 14 + 15);
    }

    #[test]
    fn seal_marks_immutable() {
        let seg = segment();
        seg.append(&entry("key1", "value1")).unwrap();

        assert!(!seg.is_sealed());
        seg.seal().unwrap();
        assert!(seg.is_sealed());
        assert!(seg.info().sealed);
    }

    #[test]
    fn rebuild_index_replays_frames() {
        let mut data = Vec::new();
        data.extend(entry("key1", "value1").encode());
        data.extend(entry("key2", "value2").encode());
        data.extend(entry("key1", "value3").encode());

        let seg = Segment::new(3, Box::new(MemoryLog::with_frames(data)));
        assert_eq!(seg.key_count(), 0);

        seg.rebuild_index().unwrap();

        assert_eq!(seg.key_count(), 2);
        assert_eq!(seg.get("key1").unwrap().unwrap().value, "value3");
        assert_eq!(seg.get("key2").unwrap().unwrap().value, "value2");
    }

    #[test]
    fn rebuild_truncates_torn_tail() {
        let mut data = Vec::new();
        data.extend(entry("key1", "value1").encode());
        let torn = entry("key2", "value2").encode();
        data.extend(&torn[..torn.len() - 5]);

        let seg = Segment::new(0, Box::new(MemoryLog::with_frames(data)));
        seg.rebuild_index().unwrap();

        assert_eq!(seg.key_count(), 1);
        assert_eq!(seg.size(), 22);

        // Appends continue from the repaired boundary.
        let offset = seg.append(&entry("key3", "value3")).unwrap();
        assert_eq!(offset, 22);
    }

    #[test]
    fn rebuild_rejects_inconsistent_lengths() {
        let mut data = entry("key1", "value1").encode();
        data.extend(entry("key2", "value2").encode());
        // Make the second frame's internal lengths disagree with its total.
        data[22 + 4..22 + 8].copy_from_slice(&2u32.to_le_bytes());

        let seg = Segment::new(0, Box::new(MemoryLog::with_frames(data)));
        let result = seg.rebuild_index();
        assert!(matches!(result, Err(StoreError::Corruption { .. })));
    }

    #[test]
    fn read_frame_at_rejects_bad_offset() {
        let seg = segment();
        seg.append(&entry("key1", "value1")).unwrap();

        let result = seg.read_at(1000);
        assert!(matches!(result, Err(StoreError::Corruption { .. })));
    }
}
