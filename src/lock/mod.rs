mod acquisition;
mod backoff;
mod claim;
mod path;

pub use acquisition::{acquire, acquire_async, acquire_with, acquire_with_async};
pub use backoff::Backoff;
pub use claim::{release, release_async, try_claim, try_claim_async, LockGuard, LOCK_FILE_CONTENT};
pub use path::{derive_lock_path, lock_cache_dir, validate_lock_path};
