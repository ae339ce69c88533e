//! # Spool Process Locking
//!
//! Serializes spool file operations across processes. The long-running
//! listener and one-shot CLI invocations may share one spool directory, so
//! every read-modify-write of the spool happens under an exclusive `flock`
//! on `spool.lock`.
//!
//! Unlike a data-directory lock this one is held only for the duration of a
//! single spool operation and waits instead of failing when contended.
//!
//! A replay pass additionally holds a [`ReplayClaim`] on each replay file it
//! claimed until the pass completes. Other passes skip claimed files; a
//! crashed holder releases its claims with its file descriptors.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::domain::SpoolError;

/// Exclusive lock on a spool directory, released on drop (RAII).
pub struct SpoolLock {
    file: File,
    path: PathBuf,
}

impl SpoolLock {
    const LOCK_FILE: &'static str = "spool.lock";

    /// Blocks until the lock is held.
    pub fn acquire(spool_dir: &Path) -> Result<Self, SpoolError> {
        let path = spool_dir.join(Self::LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| SpoolError::Lock(format!("{}: {e}", path.display())))?;

        file.lock_exclusive()
            .map_err(|e| SpoolError::Lock(format!("{}: {e}", path.display())))?;

        // Holder PID for operators inspecting a stuck spool.
        let mut locked = file;
        locked.set_len(0)?;
        writeln!(locked, "{}", std::process::id())?;

        Ok(Self { file: locked, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SpoolLock {
    fn drop(&mut self) {
        // The lock file itself stays: removing it would let a waiter lock an
        // unlinked inode while a newcomer locks a fresh one.
        let _ = self.file.unlock();
    }
}

/// Exclusive hold on one `audit-replay-*.jsonl` file for the lifetime of a
/// replay batch.
#[derive(Debug)]
pub struct ReplayClaim {
    file: File,
    path: PathBuf,
}

impl ReplayClaim {
    /// `Ok(None)` when another batch holds the file or it is already gone.
    ///
    /// Callers hold the [`SpoolLock`] so a claim cannot race the removal of
    /// a completed replay file.
    pub fn try_claim(path: &Path) -> Result<Option<Self>, SpoolError> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SpoolError::Lock(format!("{}: {e}", path.display()))),
        };
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(_) => Ok(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ReplayClaim {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
