//! Critical sections guarded by a lock file.
//!
//! ```no_run
//! use syncfile::{LockConfig, SyncFileOp, SyncFileError};
//!
//! # fn main() -> Result<(), SyncFileError> {
//! let op = SyncFileOp::new(LockConfig::default())?;
//! let total = op.run("/tmp/locks/counter.lock", || {
//!     // Only one process at a time gets here
//!     Ok::<_, SyncFileError>(42)
//! })?;
//! # assert_eq!(total, 42);
//! # Ok(())
//! # }
//! ```

use crate::config::LockConfig;
use crate::error::{Result, SyncFileError};
use crate::lock::{acquire, acquire_async, derive_lock_path, validate_lock_path};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Runs work while holding a lock file, releasing it on every exit path.
///
/// The configuration is fixed at construction and shared read-only by every
/// acquisition made through this value (and its clones).
#[derive(Debug, Clone, Default)]
pub struct SyncFileOp {
    config: LockConfig,
}

impl SyncFileOp {
    pub fn new(config: LockConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Acquire `lock_path`, run `work`, then remove the lock file.
    ///
    /// A lock timeout converts into `E` and means `work` never ran. An error
    /// from `work` is returned as-is once the lock is released.
    pub fn run<T, E, F>(&self, lock_path: impl AsRef<Path>, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<SyncFileError>,
    {
        let lock_path = lock_path.as_ref();
        let guard = acquire(lock_path, &self.config)?;
        let outcome = work();
        settle(lock_path, outcome, guard.release())
    }

    /// [`SyncFileOp::run`] keyed by the resource being protected.
    ///
    /// The lock file lives in the per-user lock directory under a name
    /// derived from the resource's absolute path, so every process that
    /// names the same resource contends on the same lock.
    pub fn run_for<T, E, F>(&self, resource: impl AsRef<Path>, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<SyncFileError>,
    {
        let lock_path = lock_path_for(resource.as_ref())?;
        self.run(lock_path, work)
    }

    /// Async counterpart of [`SyncFileOp::run_for`].
    pub async fn run_for_async<T, E, F, Fut>(
        &self,
        resource: impl AsRef<Path>,
        work: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<SyncFileError>,
    {
        let lock_path = lock_path_for(resource.as_ref())?;
        self.run_async(lock_path, work).await
    }

    /// Async counterpart of [`SyncFileOp::run`].
    ///
    /// If the returned future is dropped while holding the lock, the lock
    /// file is removed as the future is dropped.
    pub async fn run_async<T, E, F, Fut>(
        &self,
        lock_path: impl AsRef<Path>,
        work: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<SyncFileError>,
    {
        let lock_path = lock_path.as_ref();
        let guard = acquire_async(lock_path, &self.config).await?;
        let outcome = work().await;
        settle(lock_path, outcome, guard.release_async().await)
    }
}

fn lock_path_for(resource: &Path) -> Result<PathBuf> {
    let lock_path = derive_lock_path(resource)?;
    validate_lock_path(&lock_path, resource)?;
    Ok(lock_path)
}

fn settle<T, E>(
    lock_path: &Path,
    outcome: std::result::Result<T, E>,
    released: Result<()>,
) -> std::result::Result<T, E>
where
    E: From<SyncFileError>,
{
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(release_err.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_err)) => {
            // The work's own error takes precedence
            warn!(
                "Failed to release {} after failed operation: {}",
                lock_path.display(),
                release_err
            );
            Err(e)
        }
    }
}
