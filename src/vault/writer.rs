//! Crash-safe commit of the vault document.
//!
//! The new document is written to a temp file in the same directory,
//! fsynced, then renamed over the target.  Readers therefore see either
//! the old complete file or the new complete file.  If anything fails
//! before the rename, the temp file is removed when it is dropped.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::format::VaultDocument;
use crate::errors::Result;

/// Serialize `document` and atomically replace the file at `path`.
pub fn commit(document: &VaultDocument, path: &Path) -> Result<()> {
    let bytes = document.to_bytes()?;
    let staged = stage(&bytes, path)?;
    publish(staged, path)
}

/// Write `bytes` to a durable temp file next to `path`.
///
/// Dropping the returned handle without publishing deletes it, which is
/// what an interrupted commit looks like to the vault directory.
pub(crate) fn stage(bytes: &[u8], path: &Path) -> Result<NamedTempFile> {
    let dir = parent_dir(path);
    ensure_private_dir(dir)?;

    let prefix = format!(
        ".{}.",
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;

    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    debug!(tmp = %tmp.path().display(), len = bytes.len(), "Staged vault document");
    Ok(tmp)
}

/// Rename a staged temp file over `path`.
pub(crate) fn publish(staged: NamedTempFile, path: &Path) -> Result<()> {
    // On failure the error hands the temp file back; dropping it unlinks it.
    staged.persist(path).map_err(|e| {
        let tempfile::PersistError { error, file } = e;
        drop(file);
        error
    })?;

    if let Err(e) = sync_dir(parent_dir(path)) {
        warn!(path = %path.display(), error = %e, "Failed to fsync vault directory");
    }
    debug!(path = %path.display(), "Committed vault document");
    Ok(())
}

/// Write a file with owner-only permissions (non-atomic).
pub(crate) fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // An older file may have been created with looser permissions.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Create `dir` (and parents) with owner-only permissions.  Existing
/// directories are left as they are.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)?;
    Ok(())
}

/// Create the directory that will hold `path`.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    ensure_private_dir(parent_dir(path))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
