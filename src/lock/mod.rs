//! Cross-process mutual exclusion over the vault file.
//!
//! A separate, empty lock file arbitrates writers.  The lock is an OS
//! advisory lock taken through `fs2` (`flock` on Unix, `LockFileEx` on
//! Windows).  It belongs to the open file handle, so the kernel drops it
//! when the owning process dies, and two handles conflict even inside
//! one process.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::errors::{EnvyError, Result};
use crate::vault::writer;

/// An exclusive hold on a lock file.  Released on `release` or drop.
pub struct FileLock {
    path: PathBuf,
    file: Option<File>,
}

impl FileLock {
    /// Block until the exclusive lock on `path` is obtained.
    ///
    /// Creates the lock file (and its directory) if absent.  There is no
    /// timeout; use `try_acquire` with your own backoff for bounded waits.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        retry_interrupted(|| file.lock_exclusive()).map_err(|e| lock_error(path, e))?;
        debug!(path = %path.display(), "Acquired exclusive vault lock");
        Ok(Self::held(path, file))
    }

    /// Take the lock if it is free, otherwise return `None` immediately.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let file = open_lock_file(path)?;
        match retry_interrupted(|| file.try_lock_exclusive()) {
            Ok(()) => {
                debug!(path = %path.display(), "Acquired exclusive vault lock (non-blocking)");
                Ok(Some(Self::held(path, file)))
            }
            Err(e) if is_contended(&e) => {
                debug!(path = %path.display(), "Vault lock busy");
                Ok(None)
            }
            Err(e) => Err(lock_error(path, e)),
        }
    }

    /// Release the lock.  Calling this more than once is a no-op.
    pub fn release(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        // Closing the handle drops the lock too; unlock explicitly so a
        // failure is reported instead of swallowed.
        let result = FileExt::unlock(&file).map_err(|e| lock_error(&self.path, e));
        drop(file);
        result
    }

    /// Whether this handle still holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn held(path: &Path, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            file: Some(file),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(path = %self.path.display(), error = %e, "Failed to release vault lock");
        }
    }
}

/// Open (creating if needed) the marker file with owner-only permissions.
fn open_lock_file(path: &Path) -> Result<File> {
    writer::ensure_parent_dir(path)?;

    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    Ok(options.open(path)?)
}

fn retry_interrupted<F>(mut op: F) -> io::Result<()>
where
    F: FnMut() -> io::Result<()>,
{
    loop {
        match op() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// `EWOULDBLOCK` on Unix, `ERROR_LOCK_VIOLATION` on Windows.
fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn lock_error(path: &Path, err: io::Error) -> EnvyError {
    EnvyError::Lock(format!("lock {}: {err}", path.display()))
}
