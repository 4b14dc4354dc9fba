use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use syncfile::lock::{acquire, derive_lock_path};
use syncfile::{LockConfig, SyncFileError, SyncFileOp};
use tempfile::TempDir;

#[derive(Debug, PartialEq)]
enum JobError {
    Lock(String),
    Rejected(&'static str),
}

impl From<SyncFileError> for JobError {
    fn from(e: SyncFileError) -> Self {
        JobError::Lock(e.to_string())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn no_wait() -> LockConfig {
    LockConfig::new()
        .with_initial_delay(Duration::from_millis(1))
        .with_delay_cap(Duration::from_millis(1))
        .with_max_over_cap_retries(0)
}

#[test]
fn test_run_returns_value_and_releases() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("job.lock");
    let op = SyncFileOp::default();

    let value = op
        .run(&lock_path, || {
            assert!(lock_path.exists(), "Lock must be held during work");
            Ok::<_, SyncFileError>("done")
        })
        .unwrap();

    assert_eq!(value, "done");
    assert!(!lock_path.exists());
}

#[test]
fn test_run_releases_and_forwards_work_error() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("job.lock");
    let op = SyncFileOp::default();

    let result: Result<(), JobError> = op.run(&lock_path, || Err(JobError::Rejected("bad input")));

    assert_eq!(result, Err(JobError::Rejected("bad input")));
    assert!(!lock_path.exists());
}

#[test]
fn test_run_releases_on_panic() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("job.lock");
    let op = SyncFileOp::default();

    let outcome = panic::catch_unwind(|| {
        let _: Result<(), SyncFileError> = op.run(&lock_path, || panic!("work blew up"));
    });

    assert!(outcome.is_err());
    assert!(!lock_path.exists());
}

#[test]
fn test_run_reports_externally_removed_lock() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("job.lock");
    let op = SyncFileOp::default();

    let result = op.run(&lock_path, || {
        std::fs::remove_file(&lock_path).unwrap();
        Ok::<_, SyncFileError>(1)
    });

    assert!(result.unwrap_err().is_release_failure());
}

#[test]
fn test_concurrent_runs_are_mutually_exclusive() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("shared").join("counter.lock");
    let op = SyncFileOp::default();

    let active = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let op = op.clone();
            let lock_path = lock_path.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            let completed = completed.clone();
            thread::spawn(move || {
                op.run(&lock_path, || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, SyncFileError>(())
                })
                .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    assert_eq!(completed.load(Ordering::SeqCst), 8);
    assert!(!lock_path.exists());
}

#[test]
fn test_distinct_identities_do_not_interfere() {
    let temp = TempDir::new().unwrap();
    let lock_a = temp.path().join("a.lock");
    let lock_b = temp.path().join("b.lock");

    let _held_a = acquire(&lock_a, &LockConfig::default()).unwrap();

    let op = SyncFileOp::new(no_wait()).unwrap();
    let on_b = op.run(&lock_b, || Ok::<_, JobError>("b"));
    assert_eq!(on_b, Ok("b"));

    let on_a: Result<&str, JobError> = op.run(&lock_a, || Ok("a"));
    assert!(matches!(on_a, Err(JobError::Lock(msg)) if msg.contains("a.lock")));
}

#[test]
fn test_run_for_locks_derived_path() {
    let temp = TempDir::new().unwrap();
    let resource = temp.path().join("ledger.json");
    let lock_path = derive_lock_path(&resource).unwrap();
    let op = SyncFileOp::default();

    let held = op
        .run_for(&resource, || Ok::<_, SyncFileError>(lock_path.exists()))
        .unwrap();

    assert!(held, "Derived lock file must exist while work runs");
    assert!(!lock_path.exists());
    assert!(!resource.exists(), "The resource itself is never created");
}

#[test]
fn test_run_for_contends_with_direct_lock() {
    let temp = TempDir::new().unwrap();
    let resource = temp.path().join("ledger.json");
    let lock_path = derive_lock_path(&resource).unwrap();

    let _held = acquire(&lock_path, &LockConfig::default()).unwrap();

    let op = SyncFileOp::new(no_wait()).unwrap();
    let result: Result<(), SyncFileError> = op.run_for(&resource, || Ok(()));
    assert!(result.unwrap_err().is_timeout());
}

#[test]
fn test_run_for_missing_parent_fails_before_work() {
    let temp = TempDir::new().unwrap();
    let resource = temp.path().join("missing").join("ledger.json");
    let op = SyncFileOp::default();

    let mut ran = false;
    let result: Result<(), SyncFileError> = op.run_for(&resource, || {
        ran = true;
        Ok(())
    });

    assert!(matches!(result, Err(SyncFileError::PathNotFound(_))));
    assert!(!ran);
}
