//! Disk-backed log.

use crate::error::{StorageError, StorageResult};
use crate::log::AppendLog;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

/// An append-only log on a disk file.
///
/// The file handle is opened once and held for the log's lifetime. Two
/// properties of the store lean on that:
///
/// - Reads are positional (`pread`-style), never moving a shared cursor,
///   so getters resolving different frames of the same sealed segment do
///   not serialize against each other.
/// - An unlinked file stays readable through the held descriptor, so
///   compaction may delete a merged-away segment while getters still hold
///   its `FileLog`; their reads complete against the removed file.
///
/// The length is tracked in the struct rather than asked of the filesystem
/// on every roll decision; it is authoritative because this handle is the
/// only writer.
#[derive(Debug)]
pub struct FileLog {
    file: File,
    len: u64,
}

impl FileLog {
    /// Opens the log file at `path`, creating it empty if absent.
    ///
    /// An existing file is picked up where it left off: the length is read
    /// from its metadata and appends continue at the tail. Torn frames are
    /// the segment layer's problem, repaired via [`AppendLog::truncate`].
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();

        Ok(Self { file, len })
    }
}

/// Positional read that does not move the file cursor.
#[cfg(unix)]
fn read_full_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_full_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.seek_read(&mut buf[filled..], offset + filled as u64)?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        filled += n;
    }
    Ok(())
}

impl AppendLog for FileLog {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        let end = offset.saturating_add(buf.len() as u64);
        if end > self.len {
            return Err(StorageError::OutOfBounds {
                offset,
                requested: buf.len(),
                len: self.len,
            });
        }

        read_full_at(&self.file, offset, buf)?;
        Ok(())
    }

    fn append(&mut self, frame: &[u8]) -> StorageResult<u64> {
        let offset = self.len;
        if frame.is_empty() {
            return Ok(offset);
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(frame)?;
        self.len += frame.len() as u64;

        Ok(offset)
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, offset: u64) -> StorageResult<()> {
        if offset > self.len {
            return Err(StorageError::TruncatePastEnd {
                offset,
                len: self.len,
            });
        }

        self.file.set_len(offset)?;
        self.file.sync_all()?;
        self.len = offset;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    /// Appends a few fake frames and returns their offsets.
    fn seed(log: &mut FileLog, frames: &[&[u8]]) -> Vec<u64> {
        frames.iter().map(|f| log.append(f).unwrap()).collect()
    }

    #[test]
    fn append_hands_out_frame_offsets() {
        let dir = tempdir().unwrap();
        let mut log = FileLog::open(&dir.path().join("seg")).unwrap();

        let offsets = seed(&mut log, &[b"frame-one", b"frame-two-longer", b"x"]);

        assert_eq!(offsets, vec![0, 9, 25]);
        assert_eq!(log.len(), 26);
        assert!(!log.is_empty());
    }

    #[test]
    fn offsets_read_back_their_frames() {
        let dir = tempdir().unwrap();
        let mut log = FileLog::open(&dir.path().join("seg")).unwrap();
        let offsets = seed(&mut log, &[b"aaaa", b"bbbb", b"cccc"]);

        // Read out of append order; positional reads share no cursor.
        let mut buf = [0u8; 4];
        log.read_exact_at(offsets[2], &mut buf).unwrap();
        assert_eq!(&buf, b"cccc");
        log.read_exact_at(offsets[0], &mut buf).unwrap();
        assert_eq!(&buf, b"aaaa");
        log.read_exact_at(offsets[1], &mut buf).unwrap();
        assert_eq!(&buf, b"bbbb");
    }

    #[test]
    fn length_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg");

        {
            let mut log = FileLog::open(&path).unwrap();
            log.append(b"persisted frame").unwrap();
            log.sync().unwrap();
        }

        let log = FileLog::open(&path).unwrap();
        assert_eq!(log.len(), 15);

        let mut buf = vec![0u8; 15];
        log.read_exact_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"persisted frame");
    }

    #[test]
    fn reads_past_the_tail_are_out_of_bounds() {
        let dir = tempdir().unwrap();
        let mut log = FileLog::open(&dir.path().join("seg")).unwrap();
        log.append(b"short").unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(
            log.read_exact_at(10, &mut buf),
            Err(StorageError::OutOfBounds { offset: 10, .. })
        ));
        // Starting inside but running over the tail is just as invalid.
        assert!(matches!(
            log.read_exact_at(3, &mut buf),
            Err(StorageError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn torn_tail_repair_then_append_continues() {
        let dir = tempdir().unwrap();
        let mut log = FileLog::open(&dir.path().join("seg")).unwrap();
        seed(&mut log, &[b"good-frame!!", b"half-writ"]);

        // Recovery decides the second frame is torn and cuts it off.
        log.truncate(12).unwrap();
        assert_eq!(log.len(), 12);

        // The next append lands exactly at the repaired boundary.
        assert_eq!(log.append(b"replacement").unwrap(), 12);
        let mut buf = vec![0u8; 11];
        log.read_exact_at(12, &mut buf).unwrap();
        assert_eq!(&buf, b"replacement");
    }

    #[test]
    fn truncate_past_tail_is_rejected() {
        let dir = tempdir().unwrap();
        let mut log = FileLog::open(&dir.path().join("seg")).unwrap();
        log.append(b"frame").unwrap();

        assert!(matches!(
            log.truncate(100),
            Err(StorageError::TruncatePastEnd { offset: 100, len: 5 })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn reads_survive_unlink() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg");
        let mut log = FileLog::open(&path).unwrap();
        log.append(b"outlives the name").unwrap();

        // Compaction unlinks merged-away segments while readers may still
        // hold them; the held descriptor must keep working.
        std::fs::remove_file(&path).unwrap();

        let mut buf = vec![0u8; 17];
        log.read_exact_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"outlives the name");
    }

    #[test]
    fn concurrent_positional_reads() {
        let dir = tempdir().unwrap();
        let mut log = FileLog::open(&dir.path().join("seg")).unwrap();
        for i in 0u8..100 {
            log.append(&[i; 8]).unwrap();
        }

        let log = Arc::new(log);
        let readers: Vec<_> = (0..4)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    let mut buf = [0u8; 8];
                    for round in 0..50u64 {
                        let i = (t * 13 + round * 7) % 100;
                        log.read_exact_at(i * 8, &mut buf).unwrap();
                        assert_eq!(buf, [i as u8; 8]);
                    }
                })
            })
            .collect();

        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn empty_append_is_a_noop() {
        let dir = tempdir().unwrap();
        let mut log = FileLog::open(&dir.path().join("seg")).unwrap();
        log.append(b"x").unwrap();

        assert_eq!(log.append(b"").unwrap(), 1);
        assert_eq!(log.len(), 1);
    }
}
