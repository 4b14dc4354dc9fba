use super::backoff::Backoff;
use super::claim::{try_claim, try_claim_async, LockGuard};
use crate::config::LockConfig;
use crate::error::Result;
use rand::Rng;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

fn next_delay<R: Rng>(backoff: &mut Backoff<R>, lock_path: &Path) -> Result<Duration> {
    let delay = backoff
        .next_delay()
        .map_err(|e| e.at_path(lock_path))?;
    trace!(
        "Lock {} busy, retrying in {:?} (attempt {}, over-cap round {})",
        lock_path.display(),
        delay,
        backoff.attempts(),
        backoff.over_cap_rounds()
    );
    Ok(delay)
}

/// Block the current thread until the lock file is claimed.
///
/// Fails with [`crate::SyncFileError::LockTimeout`] once the backoff schedule
/// is exhausted; no lock file is left behind in that case. An invalid config
/// is rejected before the first claim attempt.
pub fn acquire(lock_path: &Path, config: &LockConfig) -> Result<LockGuard> {
    acquire_with(lock_path, Backoff::new(config)?)
}

/// [`acquire`] driven by a caller-supplied schedule.
pub fn acquire_with<R: Rng>(lock_path: &Path, mut backoff: Backoff<R>) -> Result<LockGuard> {
    debug!("Acquiring lock: {}", lock_path.display());

    while !try_claim(lock_path) {
        let delay = next_delay(&mut backoff, lock_path)?;
        std::thread::sleep(delay);
    }

    debug!(
        "Lock acquired: {} (after {} retries)",
        lock_path.display(),
        backoff.attempts()
    );
    Ok(LockGuard::new(lock_path))
}

/// Async counterpart of [`acquire`]; waiting suspends only this task.
pub async fn acquire_async(lock_path: &Path, config: &LockConfig) -> Result<LockGuard> {
    acquire_with_async(lock_path, Backoff::new(config)?).await
}

pub async fn acquire_with_async<R: Rng>(
    lock_path: &Path,
    mut backoff: Backoff<R>,
) -> Result<LockGuard> {
    debug!("Acquiring lock: {}", lock_path.display());

    while !try_claim_async(lock_path).await {
        let delay = next_delay(&mut backoff, lock_path)?;
        tokio::time::sleep(delay).await;
    }

    debug!(
        "Lock acquired: {} (after {} retries)",
        lock_path.display(),
        backoff.attempts()
    );
    Ok(LockGuard::new(lock_path))
}
