//! Sealed-segment merging.
//!
//! Compaction fuses the sealed segments into one segment holding the
//! latest value per key. The merge works on a frozen snapshot of the
//! sealed list; the active segment is never part of a cycle.
//!
//! ## Invariants
//!
//! - Every key observable in the snapshot stays observable with its
//!   newest snapshot value
//! - The merged output holds at most one entry per key
//! - Value bytes are copied verbatim; only their location changes

use crate::entry::Entry;
use crate::error::{StoreError, StoreResult};
use crate::segment::Segment;
use std::sync::Arc;

/// Statistics from one compaction cycle.
#[derive(Debug, Clone, Default)]
pub struct CompactionStats {
    /// Number of sealed segments merged.
    pub merged_segments: usize,
    /// Entries written to the merged segment (one per surviving key).
    pub live_entries: usize,
    /// Key occurrences dropped because a newer sealed segment shadowed them.
    pub shadowed_keys: usize,
    /// Combined size of the merged segments, in bytes.
    pub bytes_before: u64,
    /// Size of the merged output, in bytes.
    pub bytes_after: u64,
}

/// Result of planning a merge: the surviving entries plus statistics.
#[derive(Debug)]
pub(crate) struct MergeOutcome {
    pub entries: Vec<Entry>,
    pub stats: CompactionStats,
}

/// Plans the merge of a frozen sealed-segment snapshot.
///
/// Walks the snapshot oldest to newest. A key occurrence is skipped when
/// any strictly newer snapshot segment also indexes that key (its value is
/// superseded); otherwise the key's value is resolved through the ordinary
/// newest-first read path over the snapshot and emitted once.
pub(crate) fn merge_sealed(snapshot: &[Arc<Segment>]) -> StoreResult<MergeOutcome> {
    let mut stats = CompactionStats {
        merged_segments: snapshot.len(),
        ..CompactionStats::default()
    };
    let mut entries = Vec::new();

    for segment in snapshot {
        stats.bytes_before += segment.size();
    }

    for (position, segment) in snapshot.iter().enumerate() {
        let mut keys = segment.keys();
        // Deterministic output order within one source segment.
        keys.sort_unstable();

        for key in keys {
            if snapshot[position + 1..].iter().any(|newer| newer.contains(&key)) {
                stats.shadowed_keys += 1;
                continue;
            }

            let entry = read_newest(snapshot, &key)?;
            stats.bytes_after += entry.encoded_len() as u64;
            entries.push(entry);
        }
    }

    stats.live_entries = entries.len();
    Ok(MergeOutcome { entries, stats })
}

/// Newest-first lookup across the snapshot.
fn read_newest(snapshot: &[Arc<Segment>], key: &str) -> StoreResult<Entry> {
    for segment in snapshot.iter().rev() {
        if let Some(offset) = segment.lookup(key) {
            return segment.read_at(offset);
        }
    }
    Err(StoreError::not_found(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftkv_storage::MemoryLog;

    fn sealed_segment(id: u64, entries: &[(&str, &str)]) -> Arc<Segment> {
        let segment = Segment::new(id, Box::new(MemoryLog::new()));
        for (key, value) in entries {
            segment.append(&Entry::new(*key, *value).unwrap()).unwrap();
        }
        segment.seal().unwrap();
        Arc::new(segment)
    }

    fn values(outcome: &MergeOutcome) -> Vec<(String, String)> {
        outcome
            .entries
            .iter()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    #[test]
    fn newer_segment_wins_across_segments() {
        let snapshot = vec![
            sealed_segment(0, &[("key1", "old"), ("key2", "kept")]),
            sealed_segment(1, &[("key1", "new")]),
        ];

        let outcome = merge_sealed(&snapshot).unwrap();

        let mut got = values(&outcome);
        got.sort();
        assert_eq!(
            got,
            vec![
                ("key1".to_string(), "new".to_string()),
                ("key2".to_string(), "kept".to_string()),
            ]
        );
        assert_eq!(outcome.stats.shadowed_keys, 1);
        assert_eq!(outcome.stats.live_entries, 2);
    }

    #[test]
    fn later_offset_wins_within_segment() {
        let snapshot = vec![sealed_segment(0, &[("key1", "v1"), ("key1", "v2")])];

        let outcome = merge_sealed(&snapshot).unwrap();

        assert_eq!(values(&outcome), vec![("key1".to_string(), "v2".to_string())]);
    }

    #[test]
    fn output_has_one_entry_per_key() {
        let snapshot = vec![
            sealed_segment(0, &[("a", "1"), ("b", "1"), ("a", "2")]),
            sealed_segment(1, &[("b", "2"), ("c", "1")]),
            sealed_segment(2, &[("a", "3")]),
        ];

        let outcome = merge_sealed(&snapshot).unwrap();

        let mut got = values(&outcome);
        got.sort();
        assert_eq!(
            got,
            vec![
                ("a".to_string(), "3".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(outcome.stats.merged_segments, 3);
    }

    #[test]
    fn stats_track_bytes() {
        let snapshot = vec![sealed_segment(0, &[("key1", "value11"), ("key1", "value12")])];

        let outcome = merge_sealed(&snapshot).unwrap();

        assert_eq!(outcome.stats.bytes_before, 46);
        assert_eq!(outcome.stats.bytes_after, 23);
    }

    #[test]
    fn empty_snapshot_produces_nothing() {
        let outcome = merge_sealed(&[]).unwrap();
        assert!(outcome.entries.is_empty());
        assert_eq!(outcome.stats.live_entries, 0);
    }
}
