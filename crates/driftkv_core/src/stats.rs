//! Store statistics.
//!
//! Atomic counters surfaced through [`crate::Store::stats`]; readable
//! while operations are in progress.

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one store.
///
/// All counters are monotonically increasing.
#[derive(Debug, Default)]
pub struct StoreStats {
    puts: AtomicU64,
    gets: AtomicU64,
    misses: AtomicU64,
    bytes_written: AtomicU64,
    segments_rolled: AtomicU64,
    compactions: AtomicU64,
}

impl StoreStats {
    pub(crate) fn record_put(&self, bytes: u64) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_roll(&self) {
        self.segments_rolled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compaction(&self) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
    }

    /// Total successful puts.
    #[must_use]
    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Total gets that found a value.
    #[must_use]
    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    /// Total gets that missed.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Total entry bytes appended.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Number of times the active segment was sealed and replaced.
    #[must_use]
    pub fn segments_rolled(&self) -> u64 {
        self.segments_rolled.load(Ordering::Relaxed)
    }

    /// Number of completed compaction cycles.
    #[must_use]
    pub fn compactions(&self) -> u64 {
        self.compactions.load(Ordering::Relaxed)
    }
}
