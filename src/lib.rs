//! Cross-process mutual exclusion through atomically created lock files

pub mod config;
pub mod error;
pub mod lock;
pub mod op;

pub use config::LockConfig;
pub use error::{Result, SyncFileError};
pub use lock::{Backoff, LockGuard};
pub use op::SyncFileOp;
