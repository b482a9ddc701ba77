//! Store engine: segment list ownership, the write pipeline, reads, and
//! the background compactor.
//!
//! ## Concurrency
//!
//! - Exactly one principal appends: `put` serializes through the writer
//!   mutex, which also covers segment rolls.
//! - `get` clones the segment list under a read lock and resolves offsets
//!   against `Arc<Segment>` handles, so the terminal compaction swap can
//!   unlink files without invalidating in-flight reads (open descriptors
//!   keep unlinked files readable).
//! - The compactor works from a frozen snapshot of the sealed segments and
//!   takes the writer lock only for the terminal list swap.

use crate::compaction::{self, CompactionStats};
use crate::config::Config;
use crate::dir::StoreDir;
use crate::entry::Entry;
use crate::error::{StoreError, StoreResult};
use crate::segment::{Segment, SegmentInfo};
use crate::stats::StoreStats;
use driftkv_storage::FileLog;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

/// How many segments (active included) trigger a compaction cycle.
const COMPACTION_TRIGGER: usize = 3;

/// Report from [`Store::verify`].
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    /// Segments scanned.
    pub segments_checked: usize,
    /// Frames decoded successfully.
    pub entries_decoded: usize,
    /// Human-readable descriptions of inconsistencies found.
    pub issues: Vec<String>,
}

impl VerifyReport {
    /// Whether every frame of every segment decoded cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

struct StoreInner {
    config: Config,
    dir: StoreDir,
    /// Oldest first; the last element is the only active segment.
    segments: RwLock<Vec<Arc<Segment>>>,
    /// Next numeric file suffix. Monotonic, never reused.
    next_segment_id: AtomicU64,
    /// Serializes puts, rolls, and the compaction swap.
    writer: Mutex<()>,
    /// Set while a compaction cycle is running.
    compacting: AtomicBool,
    open: AtomicBool,
    stats: StoreStats,
}

/// A persistent, append-only key-value store.
///
/// # Example
///
/// ```rust,no_run
/// use driftkv_core::{Config, Store};
///
/// let store = Store::open("./data", Config::new().segment_size(4096))?;
/// store.put("greeting", "hello")?;
/// assert_eq!(store.get("greeting")?, "hello");
/// store.close()?;
/// # Ok::<(), driftkv_core::StoreError>(())
/// ```
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Opens or creates a store in the given directory.
    ///
    /// Discovers existing `current-data<N>` files in suffix order, rebuilds
    /// each segment's index by replaying its frames, and designates the
    /// highest-numbered file (or a freshly created `current-data0`) as the
    /// active segment. Torn trailing entries are truncated away; any other
    /// framing inconsistency fails the open with `Corruption`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a zero segment size or an unusable path
    /// - `StoreLocked` if another process holds the directory lock
    /// - `Corruption` if a segment holds inconsistent framing
    /// - `Io` / `Storage` on filesystem failure
    pub fn open(path: impl AsRef<Path>, config: Config) -> StoreResult<Self> {
        if config.segment_size == 0 {
            return Err(StoreError::invalid_argument("segment size must be positive"));
        }

        let dir = StoreDir::open(path.as_ref(), config.create_if_missing)?;

        let stale = dir.remove_stale_tmp_files()?;
        if stale > 0 {
            tracing::warn!(stale, "removed staging files from interrupted compaction");
        }

        let ids = dir.list_segment_ids()?;

        let mut segments: Vec<Arc<Segment>> = Vec::with_capacity(ids.len().max(1));

        if ids.is_empty() {
            let log = FileLog::open(&dir.segment_path(0))?;
            dir.sync_directory()?;
            segments.push(Arc::new(Segment::new(0, Box::new(log))));
        } else {
            for &id in &ids {
                let log = FileLog::open(&dir.segment_path(id))?;
                let segment = Segment::new(id, Box::new(log));
                segment.rebuild_index()?;
                segments.push(Arc::new(segment));
            }
        }

        // Everything but the highest suffix is sealed.
        for segment in &segments[..segments.len() - 1] {
            segment.seal()?;
        }

        let next_segment_id = segments.last().map_or(1, |s| s.id() + 1);

        tracing::debug!(
            path = %dir.path().display(),
            segments = segments.len(),
            next_segment_id,
            "store opened"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                config,
                dir,
                segments: RwLock::new(segments),
                next_segment_id: AtomicU64::new(next_segment_id),
                writer: Mutex::new(()),
                compacting: AtomicBool::new(false),
                open: AtomicBool::new(true),
                stats: StoreStats::default(),
            }),
        })
    }

    /// Returns the most recent value written for `key`.
    ///
    /// Scans segments newest to oldest; the first index hit is the latest
    /// value. Runs concurrently with other gets and with a put.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if the key has never been written; `StoreClosed`
    /// after `close`; `Corruption` / `Storage` if the resolved frame
    /// cannot be read back.
    pub fn get(&self, key: &str) -> StoreResult<String> {
        self.inner.ensure_open()?;

        let snapshot: Vec<Arc<Segment>> = self.inner.segments.read().clone();

        for segment in snapshot.iter().rev() {
            if let Some(offset) = segment.lookup(key) {
                let entry = segment.read_at(offset)?;
                self.inner.stats.record_get();
                return Ok(entry.value);
            }
        }

        self.inner.stats.record_miss();
        Err(StoreError::not_found(key))
    }

    /// Durably appends an entry and updates the active segment's index.
    ///
    /// Rolls the active segment first when the entry would push it past
    /// the configured size. Returns once the append is indexed; a
    /// triggered compaction runs in the background without blocking the
    /// caller.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty key or value, `EntryTooLarge` if a
    /// single entry exceeds the segment size, `StoreClosed` after `close`,
    /// `Io` / `Storage` on write failure.
    pub fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let entry = Entry::new(key, value)?;
        let frame_len = entry.encoded_len() as u64;

        if frame_len > self.inner.config.segment_size {
            return Err(StoreError::EntryTooLarge {
                size: frame_len,
                max: self.inner.config.segment_size,
            });
        }

        let _writer = self.inner.writer.lock();
        self.inner.ensure_open()?;

        let mut active = self
            .inner
            .segments
            .read()
            .last()
            .cloned()
            .ok_or_else(|| StoreError::invalid_operation("store has no active segment"))?;

        if active.size() + frame_len > self.inner.config.segment_size {
            active = self.inner.roll(&active)?;
        }

        active.append(&entry)?;
        if self.inner.config.sync_on_put {
            active.sync()?;
        }
        self.inner.stats.record_put(frame_len);

        if self.inner.segments.read().len() >= COMPACTION_TRIGGER {
            self.inner.spawn_compaction();
        }

        Ok(())
    }

    /// Flushes and closes the store.
    ///
    /// After `close` every operation fails with `StoreClosed`. Closing an
    /// already-closed store is a no-op.
    pub fn close(&self) -> StoreResult<()> {
        let _writer = self.inner.writer.lock();

        if !self.inner.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let snapshot: Vec<Arc<Segment>> = self.inner.segments.read().clone();
        for segment in &snapshot {
            segment.sync()?;
        }

        tracing::debug!(path = %self.inner.dir.path().display(), "store closed");
        Ok(())
    }

    /// Whether the store is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// Whether a background compaction cycle is currently running.
    #[must_use]
    pub fn is_compacting(&self) -> bool {
        self.inner.compacting.load(Ordering::Acquire)
    }

    /// Number of segments, active included.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.inner.segments.read().len()
    }

    /// Per-segment information, oldest first.
    #[must_use]
    pub fn segments(&self) -> Vec<SegmentInfo> {
        self.inner.segments.read().iter().map(|s| s.info()).collect()
    }

    /// Number of distinct keys observable across all segments.
    #[must_use]
    pub fn key_count(&self) -> usize {
        let snapshot: Vec<Arc<Segment>> = self.inner.segments.read().clone();
        let mut keys = HashSet::new();
        for segment in &snapshot {
            keys.extend(segment.keys());
        }
        keys.len()
    }

    /// Operation counters.
    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.inner.stats
    }

    /// Path of the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.dir.path()
    }

    /// Runs a compaction cycle synchronously.
    ///
    /// Merges the currently sealed segments like the background trigger
    /// would. A no-op returning zeroed stats when nothing is sealed.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if a background cycle is already running;
    /// otherwise whatever the cycle itself fails with.
    pub fn compact_now(&self) -> StoreResult<CompactionStats> {
        self.inner.ensure_open()?;

        if self.inner.compacting.swap(true, Ordering::AcqRel) {
            return Err(StoreError::invalid_operation(
                "compaction already in progress",
            ));
        }

        let result = self.inner.run_compaction();
        self.inner.compacting.store(false, Ordering::Release);

        result.map(Option::unwrap_or_default)
    }

    /// Decodes every frame of every segment, collecting inconsistencies.
    ///
    /// Corruption found here is reported, not fatal: the store keeps
    /// serving keys whose frames are intact.
    pub fn verify(&self) -> StoreResult<VerifyReport> {
        self.inner.ensure_open()?;

        let snapshot: Vec<Arc<Segment>> = self.inner.segments.read().clone();
        let mut report = VerifyReport::default();

        for segment in &snapshot {
            report.segments_checked += 1;
            let size = segment.size();
            let mut offset = 0u64;

            while offset < size {
                match segment.read_frame_at(offset) {
                    Ok((_, frame_len)) => {
                        report.entries_decoded += 1;
                        offset += frame_len;
                    }
                    Err(e) => {
                        report
                            .issues
                            .push(format!("segment {}: offset {offset}: {e}", segment.id()));
                        break;
                    }
                }
            }
        }

        Ok(report)
    }
}

impl StoreInner {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::StoreClosed)
        }
    }

    /// Seals the active segment and creates the next one.
    ///
    /// Caller holds the writer lock.
    fn roll(&self, active: &Arc<Segment>) -> StoreResult<Arc<Segment>> {
        active.seal()?;

        let id = self.next_segment_id.fetch_add(1, Ordering::AcqRel);
        let log = FileLog::open(&self.dir.segment_path(id))?;
        self.dir.sync_directory()?;

        let segment = Arc::new(Segment::new(id, Box::new(log)));
        self.segments.write().push(Arc::clone(&segment));
        self.stats.record_roll();

        tracing::debug!(sealed = active.id(), created = id, "rolled active segment");
        Ok(segment)
    }

    /// Starts a background compaction cycle unless one is running.
    fn spawn_compaction(self: &Arc<Self>) {
        if self.compacting.swap(true, Ordering::AcqRel) {
            return;
        }

        let inner = Arc::clone(self);
        thread::spawn(move || {
            match inner.run_compaction() {
                Ok(Some(stats)) => {
                    tracing::info!(
                        merged = stats.merged_segments,
                        live = stats.live_entries,
                        reclaimed = stats.bytes_before.saturating_sub(stats.bytes_after),
                        "compaction finished"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "compaction failed");
                }
            }
            inner.compacting.store(false, Ordering::Release);
        });
    }

    /// One compaction cycle: merge the sealed snapshot, swap, unlink.
    ///
    /// Returns `None` when there was nothing to do (no sealed segments, or
    /// the store closed mid-cycle). The caller owns the `compacting` flag.
    fn run_compaction(&self) -> StoreResult<Option<CompactionStats>> {
        if !self.open.load(Ordering::Acquire) {
            return Ok(None);
        }

        // Freeze the sealed set; the active tail is never rewritten.
        let snapshot: Vec<Arc<Segment>> = {
            let list = self.segments.read();
            if list.len() < 2 {
                return Ok(None);
            }
            list[..list.len() - 1].to_vec()
        };

        let outcome = compaction::merge_sealed(&snapshot)?;

        // The merge is written to a staging file; until the rename below
        // a crash leaves nothing a reopen would mistake for a segment.
        let merged_id = self.next_segment_id.fetch_add(1, Ordering::AcqRel);
        let log = FileLog::open(&self.dir.segment_tmp_path(merged_id))?;
        let merged = Arc::new(Segment::new(merged_id, Box::new(log)));

        for entry in &outcome.entries {
            merged.append(entry)?;
        }
        merged.seal()?;

        let snapshot_ids: HashSet<u64> = snapshot.iter().map(|s| s.id()).collect();

        // Terminal swap: exclusive with writes and list mutation. Segments
        // created after the snapshot (the active may have rolled) stay in
        // place behind the merged one.
        {
            let _writer = self.writer.lock();

            if !self.open.load(Ordering::Acquire) {
                drop(merged);
                let _ = self.dir.remove_stale_tmp_files();
                return Ok(None);
            }

            self.dir.promote_segment_file(merged_id)?;

            let mut list = self.segments.write();
            list.retain(|s| !snapshot_ids.contains(&s.id()));
            list.insert(0, merged);
        }

        // Readers that still hold snapshot handles keep their open
        // descriptors; unlinking is safe after the swap.
        let mut old_ids: Vec<u64> = snapshot_ids.into_iter().collect();
        old_ids.sort_unstable();
        self.dir.delete_segment_files(&old_ids)?;

        self.stats.record_compaction();
        Ok(Some(outcome.stats))
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.inner.dir.path())
            .field("open", &self.is_open())
            .field("segments", &self.segment_count())
            .finish_non_exhaustive()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        // Best-effort flush; errors cannot propagate from Drop.
        let _ = self.close();
    }
}
