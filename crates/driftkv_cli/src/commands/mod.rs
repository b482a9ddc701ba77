//! CLI command implementations.

pub mod compact;
pub mod inspect;
pub mod serve;
pub mod store_ops;
pub mod verify;

use driftkv_core::{Config, Store, StoreResult};
use std::path::Path;

/// Opens an existing store for maintenance commands.
///
/// Maintenance never creates a store; a missing directory is an error.
pub(crate) fn open_existing(dir: &Path, segment_size: u64) -> StoreResult<Store> {
    Store::open(
        dir,
        Config::new()
            .create_if_missing(false)
            .segment_size(segment_size),
    )
}
