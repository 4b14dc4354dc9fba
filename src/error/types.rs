use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncFileError {
    #[error("Failed to acquire lock on {path}: locked for too long ({elapsed:?})")]
    LockTimeout { path: PathBuf, elapsed: Duration },

    #[error("Failed to release lock {path}: {source}")]
    ReleaseFailed { path: PathBuf, source: io::Error },

    #[error("Invalid lock configuration: {0}")]
    InvalidConfig(String),

    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Lock file {lock_path} would replace the resource it protects ({resource})")]
    LockPathCollision { lock_path: PathBuf, resource: PathBuf },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl SyncFileError {
    /// Timeout not yet tied to a lock path; see [`SyncFileError::at_path`].
    pub fn lock_timeout(elapsed: Duration) -> Self {
        SyncFileError::LockTimeout {
            path: PathBuf::new(),
            elapsed,
        }
    }

    /// Attach the lock path to a timeout raised by the backoff schedule.
    pub fn at_path(self, lock_path: &Path) -> Self {
        match self {
            SyncFileError::LockTimeout { elapsed, .. } => SyncFileError::LockTimeout {
                path: lock_path.to_path_buf(),
                elapsed,
            },
            other => other,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SyncFileError::LockTimeout { .. })
    }

    pub fn is_release_failure(&self) -> bool {
        matches!(self, SyncFileError::ReleaseFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncFileError>;
