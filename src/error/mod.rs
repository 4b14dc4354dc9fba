mod types;

pub use types::{Result, SyncFileError};

// Re-export for convenience
pub use SyncFileError as Error;
