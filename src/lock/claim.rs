use crate::error::{Result, SyncFileError};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Placeholder written into every lock file. Never read back.
pub const LOCK_FILE_CONTENT: &str = "Lock File.\n";

fn parent_dir(lock_path: &Path) -> Option<&Path> {
    lock_path.parent().filter(|p| !p.as_os_str().is_empty())
}

fn note_dir_failure(dir: &Path, e: io::Error) {
    // A real problem here resurfaces as a failed claim
    if e.kind() != io::ErrorKind::AlreadyExists {
        debug!("Could not create lock directory {}: {}", dir.display(), e);
    }
}

fn note_claim_failure(lock_path: &Path, e: &io::Error) {
    if e.kind() != io::ErrorKind::AlreadyExists {
        debug!("Lock claim on {} failed: {}", lock_path.display(), e);
    }
}

/// Attempt to create the lock file, failing if it already exists.
///
/// Returns `true` only when this call created the file. Contention and every
/// other I/O failure both read as `false`; nothing is left behind either way.
pub fn try_claim(lock_path: &Path) -> bool {
    if let Some(dir) = parent_dir(lock_path) {
        if let Err(e) = fs::create_dir_all(dir) {
            note_dir_failure(dir, e);
        }
    }

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
    {
        Ok(file) => file,
        Err(e) => {
            note_claim_failure(lock_path, &e);
            return false;
        }
    };

    // The file exists now, so the claim is ours even if the placeholder is lost
    if let Err(e) = file.write_all(LOCK_FILE_CONTENT.as_bytes()) {
        debug!("Could not write lock file {}: {}", lock_path.display(), e);
    }
    true
}

/// Async counterpart of [`try_claim`].
pub async fn try_claim_async(lock_path: &Path) -> bool {
    if let Some(dir) = parent_dir(lock_path) {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            note_dir_failure(dir, e);
        }
    }

    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .await
    {
        Ok(file) => file,
        Err(e) => {
            note_claim_failure(lock_path, &e);
            return false;
        }
    };

    let written = match file.write_all(LOCK_FILE_CONTENT.as_bytes()).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        debug!("Could not write lock file {}: {}", lock_path.display(), e);
    }
    true
}

/// Delete a lock file created by a successful claim.
pub fn release(lock_path: &Path) -> Result<()> {
    fs::remove_file(lock_path).map_err(|e| SyncFileError::ReleaseFailed {
        path: lock_path.to_path_buf(),
        source: e,
    })?;
    debug!("Lock released: {}", lock_path.display());
    Ok(())
}

pub async fn release_async(lock_path: &Path) -> Result<()> {
    tokio::fs::remove_file(lock_path)
        .await
        .map_err(|e| SyncFileError::ReleaseFailed {
            path: lock_path.to_path_buf(),
            source: e,
        })?;
    debug!("Lock released: {}", lock_path.display());
    Ok(())
}

/// Ownership of a claimed lock file.
///
/// Release explicitly with [`LockGuard::release`] or
/// [`LockGuard::release_async`] to observe failures. A guard that is dropped
/// unreleased (panic, cancelled future) removes the file best-effort.
#[derive(Debug)]
#[must_use = "dropping the guard releases the lock immediately"]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    pub(crate) fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            released: false,
        }
    }

    /// Get the lock file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        release(&self.path)
    }

    pub async fn release_async(mut self) -> Result<()> {
        self.released = true;
        release_async(&self.path).await
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Never panic in drop
        match fs::remove_file(&self.path) {
            Ok(_) => debug!("Lock released on drop: {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove lock file {} on drop: {}",
                self.path.display(),
                e
            ),
        }
    }
}
