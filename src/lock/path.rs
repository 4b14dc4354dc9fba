use crate::error::{Result, SyncFileError};
use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Derive a stable lock file path for a resource.
///
/// The name is `{parent}.{file_name}.{hash}.lock`, where `hash` is the first
/// eight hex digits of the SHA-256 of the resource's absolute path. The
/// resource itself does not have to exist, but its parent directory does.
pub fn derive_lock_path(resource: &Path) -> Result<PathBuf> {
    let absolute = absolute_path(resource)?;

    let filename = absolute
        .file_name()
        .ok_or_else(|| SyncFileError::Other("Resource path has no filename".to_string()))?
        .to_string_lossy();

    let parent_name = absolute
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| "root".into());

    let mut hasher = Sha256::new();
    hasher.update(absolute.to_string_lossy().as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let lock_filename = format!("{}.{}.{}.lock", parent_name, filename, &hash[..8]);
    Ok(lock_cache_dir()?.join(lock_filename))
}

fn absolute_path(resource: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = resource.canonicalize() {
        return Ok(canonical);
    }

    let filename = resource
        .file_name()
        .ok_or_else(|| SyncFileError::Other("Resource path has no filename".to_string()))?;
    let parent = match resource.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        return Err(SyncFileError::PathNotFound(parent.to_path_buf()));
    }

    Ok(parent.canonicalize()?.join(filename))
}

/// Per-user directory holding derived lock files.
///
/// Not created here: claiming a lock creates missing directories.
pub fn lock_cache_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "syncfile").ok_or_else(|| {
        SyncFileError::Other("Failed to determine lock cache directory".to_string())
    })?;

    Ok(proj_dirs.cache_dir().join("locks"))
}

fn resolved(path: &Path) -> PathBuf {
    absolute_path(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Reject a lock path that is the resource it is meant to protect.
///
/// Releasing such a lock would delete the resource.
pub fn validate_lock_path(lock_path: &Path, resource: &Path) -> Result<()> {
    if resolved(lock_path) != resolved(resource) {
        return Ok(());
    }
    Err(SyncFileError::LockPathCollision {
        lock_path: lock_path.to_path_buf(),
        resource: resource.to_path_buf(),
    })
}
