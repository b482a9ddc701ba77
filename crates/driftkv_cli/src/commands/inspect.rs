//! `inspect` command: store statistics and segment layout.

use super::open_existing;
use std::path::Path;

/// Prints the segment table and aggregate statistics.
pub fn run(dir: &Path, segment_size: u64) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(dir, segment_size)?;

    println!("Store: {}", store.path().display());
    println!("Distinct keys: {}", store.key_count());
    println!();
    println!("{:<12} {:<8} {:>12} {:>10}", "SEGMENT", "STATE", "SIZE", "KEYS");

    let mut total_size = 0u64;
    for segment in store.segments() {
        println!(
            "{:<12} {:<8} {:>12} {:>10}",
            format!("current-data{}", segment.id),
            if segment.sealed { "sealed" } else { "active" },
            segment.size,
            segment.key_count,
        );
        total_size += segment.size;
    }

    println!();
    println!("Segments: {}", store.segment_count());
    println!("Total bytes: {total_size}");

    store.close()?;
    Ok(())
}
