//! Store directory management.
//!
//! A store directory is flat: segment files named `current-data<N>` for
//! non-negative `N`, plus an advisory `LOCK` file. There is no manifest;
//! the segment files and their numeric suffixes are the whole on-disk
//! state.
//!
//! ```text
//! <store_path>/
//! ├─ LOCK             # Advisory lock for single-process access
//! ├─ current-data0    # Oldest segment
//! ├─ current-data1
//! └─ current-data4    # Highest suffix = active segment
//! ```

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Prefix for segment file names; the numeric suffix orders the segments.
const SEGMENT_FILE_PREFIX: &str = "current-data";
const LOCK_FILE: &str = "LOCK";

/// Manages the store directory layout and the process lock.
///
/// Holds an exclusive advisory lock on the directory for its lifetime;
/// only one `StoreDir` can exist per directory at a time.
#[derive(Debug)]
pub(crate) struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens or creates a store directory and acquires its lock.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the path doesn't exist and `create_if_missing`
    ///   is false, or the path is not a directory
    /// - `StoreLocked` if another process holds the lock
    /// - `Io` on filesystem failure
    pub fn open(path: &Path, create_if_missing: bool) -> StoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StoreError::invalid_argument(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(StoreError::invalid_argument(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::StoreLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the segment file with the given suffix.
    pub fn segment_path(&self, segment_id: u64) -> PathBuf {
        self.path.join(format!("{SEGMENT_FILE_PREFIX}{segment_id}"))
    }

    /// Returns the staging path a merged segment is written to before the
    /// terminal swap renames it into place.
    pub fn segment_tmp_path(&self, segment_id: u64) -> PathBuf {
        self.path
            .join(format!("{SEGMENT_FILE_PREFIX}{segment_id}.tmp"))
    }

    /// Renames a staged merged segment to its final name, durably.
    pub fn promote_segment_file(&self, segment_id: u64) -> StoreResult<()> {
        fs::rename(
            self.segment_tmp_path(segment_id),
            self.segment_path(segment_id),
        )?;
        self.sync_directory()?;
        Ok(())
    }

    /// Removes staging files left behind by an interrupted compaction.
    ///
    /// Returns the number of files removed.
    pub fn remove_stale_tmp_files(&self) -> StoreResult<usize> {
        let mut removed = 0;

        for dir_entry in fs::read_dir(&self.path)? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if name.starts_with(SEGMENT_FILE_PREFIX) && name.ends_with(".tmp") {
                fs::remove_file(dir_entry.path())?;
                removed += 1;
            }
        }

        if removed > 0 {
            self.sync_directory()?;
        }
        Ok(removed)
    }

    /// Lists the suffixes of all segment files, ascending.
    ///
    /// Files that do not match the `current-data<N>` pattern are ignored.
    pub fn list_segment_ids(&self) -> StoreResult<Vec<u64>> {
        let mut ids = Vec::new();

        for dir_entry in fs::read_dir(&self.path)? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if let Some(suffix) = name.strip_prefix(SEGMENT_FILE_PREFIX) {
                if let Ok(id) = suffix.parse::<u64>() {
                    ids.push(id);
                }
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    /// Deletes the segment files with the given suffixes.
    ///
    /// Used after compaction has swapped the merged segment in. The
    /// directory is fsynced afterwards so the unlinks are durable.
    ///
    /// Returns the number of files actually removed.
    pub fn delete_segment_files(&self, segment_ids: &[u64]) -> StoreResult<usize> {
        let mut deleted = 0;

        for &segment_id in segment_ids {
            let segment_path = self.segment_path(segment_id);
            if segment_path.exists() {
                fs::remove_file(&segment_path)?;
                deleted += 1;
            }
        }

        if deleted > 0 {
            self.sync_directory()?;
        }

        Ok(deleted)
    }

    /// Syncs the directory so file creations and deletions are durable.
    ///
    /// On Unix, fsync on a directory syncs its entries. Windows NTFS
    /// journals metadata operations, so the explicit fsync is skipped.
    #[cfg(unix)]
    pub fn sync_directory(&self) -> StoreResult<()> {
        let dir = File::open(&self.path)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn sync_directory(&self) -> StoreResult<()> {
        Ok(())
    }
}
