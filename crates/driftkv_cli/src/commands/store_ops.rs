//! `get` and `put` commands: single-shot store operations.

use driftkv_core::{Config, Store};
use std::path::Path;

/// Prints the most recent value for `key`.
///
/// An unknown key is a normal outcome, not a failure.
pub fn get(dir: &Path, segment_size: u64, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(dir, segment_size)?;

    match store.get(key) {
        Ok(value) => println!("{value}"),
        Err(e) if e.is_not_found() => println!("(key not found: {key})"),
        Err(e) => {
            store.close()?;
            return Err(e.into());
        }
    }

    store.close()?;
    Ok(())
}

/// Writes `value` under `key`, creating the store if needed.
pub fn put(
    dir: &Path,
    segment_size: u64,
    key: &str,
    value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(dir, Config::new().segment_size(segment_size))?;

    store.put(key, value)?;
    tracing::debug!(key, "stored");

    store.close()?;
    Ok(())
}
