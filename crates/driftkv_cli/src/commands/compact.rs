//! `compact` command: force a compaction cycle.

use super::open_existing;
use std::path::Path;

/// Merges the sealed segments synchronously and prints the outcome.
pub fn run(dir: &Path, segment_size: u64) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(dir, segment_size)?;

    let before = store.segment_count();
    let stats = store.compact_now()?;

    if stats.merged_segments == 0 {
        println!("Nothing to compact ({before} segments)");
    } else {
        println!(
            "Merged {} segments into one ({} live entries, {} shadowed)",
            stats.merged_segments, stats.live_entries, stats.shadowed_keys
        );
        println!(
            "Reclaimed {} bytes ({} -> {})",
            stats.bytes_before.saturating_sub(stats.bytes_after),
            stats.bytes_before,
            stats.bytes_after
        );
        println!("Segments: {} -> {}", before, store.segment_count());
    }

    store.close()?;
    Ok(())
}
