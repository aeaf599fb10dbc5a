//! Atomic file operations for cache entries.
//!
//! Writes go to a temp file next to the target, are synced, then renamed over
//! the target. A reader sees either the old value or the new one.

use crate::error::{CacheError, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Read a file as text.
///
/// Returns `None` if the file doesn't exist. Bytes that are not valid UTF-8
/// are replaced with U+FFFD rather than failing the read.
pub fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::Io {
            message: format!("Failed to read {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        }),
    }
}

/// Write `contents` to `path` atomically, creating the parent directory.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| CacheError::Io {
        message: format!("No parent directory for {}", path.display()),
        path: Some(path.to_path_buf()),
        source: None,
    })?;

    if !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| CacheError::Io {
            message: format!("Failed to create directory {}", parent.display()),
            path: Some(parent.to_path_buf()),
            source: Some(e),
        })?;
    }

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| CacheError::Io {
        message: format!("Failed to create temp file in {}", parent.display()),
        path: Some(parent.to_path_buf()),
        source: Some(e),
    })?;

    temp.write_all(contents)
        .and_then(|()| temp.flush())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| CacheError::Io {
            message: format!("Failed to write temp file {}", temp.path().display()),
            path: Some(temp.path().to_path_buf()),
            source: Some(e),
        })?;

    temp.persist(path).map_err(|e| CacheError::Io {
        message: format!("Failed to move temp file into {}", path.display()),
        path: Some(path.to_path_buf()),
        source: Some(e.error),
    })?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}
