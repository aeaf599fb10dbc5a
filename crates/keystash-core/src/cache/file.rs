//! Filesystem-backed cache store.
//!
//! Layout: `<root>/<sanitized type>/<sha256 of key>`, one file per entry
//! holding the value as plain text. Files carry no expiry: the `expires`
//! argument to `store` is ignored and `gc` has nothing to collect.

use super::atomic::{atomic_write, read_if_exists};
use super::keys::{prefixed_type, sanitize_type, KeyHasher};
use super::traits::{CacheEntry, CacheStore, EntryId};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const EMPTY_TYPE_OR_KEY: &str = "Empty type or key received by file cache";

fn require<'a>(value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(CacheError::bad_request(EMPTY_TYPE_OR_KEY)),
    }
}

/// Text form of a scalar payload.
///
/// Booleans follow the usual scalar-to-string rules: `true` is `"1"` and
/// `false` is the empty string. Numbers are written in plain decimal, so a
/// whole float loses its `.0` and large floats have no exponent.
fn scalar_text(data: &Value) -> Result<String> {
    match data {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) if n.is_f64() => Ok(n.as_f64().unwrap_or_default().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("1".to_string()),
        Value::Bool(false) => Ok(String::new()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(CacheError::bad_request(
            "You can only write scalar data to files",
        )),
    }
}

/// Cache store backed by a directory tree.
pub struct FileCacheStore {
    /// Base cache directory.
    root: PathBuf,
    /// Memoized key digests.
    hasher: KeyHasher,
    config: CacheConfig,
}

impl FileCacheStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(root, CacheConfig::default())
    }

    /// Create a store with custom configuration.
    pub fn with_config(root: impl AsRef<Path>, config: CacheConfig) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            fs::create_dir_all(root).map_err(|e| CacheError::Io {
                message: format!("Failed to create cache directory: {}", e),
                path: Some(root.to_path_buf()),
                source: Some(e),
            })?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            hasher: KeyHasher::new(config.key_hash_capacity),
            config,
        })
    }

    /// Base cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the entries of `cache_type`.
    fn type_dir(&self, cache_type: &str) -> Result<(String, PathBuf)> {
        let sanitized = sanitize_type(cache_type);
        if sanitized.is_empty() {
            return Err(CacheError::bad_request(format!(
                "Cache type {:?} has no alphanumeric characters",
                cache_type
            )));
        }
        let dir = self.root.join(&sanitized);
        Ok((sanitized, dir))
    }

    /// On-disk location of the entry for (type, key).
    pub fn entry_path(&self, cache_type: &str, key: &str) -> Result<PathBuf> {
        let (_, dir) = self.type_dir(cache_type)?;
        Ok(dir.join(self.hasher.hash(key)))
    }

    fn read_entry(&self, cache_type: &str, key: &str) -> Result<Option<CacheEntry>> {
        let (sanitized, dir) = self.type_dir(cache_type)?;
        let path = dir.join(self.hasher.hash(key));

        Ok(read_if_exists(&path)?.map(|contents| CacheEntry {
            cache_type: sanitized,
            key: key.to_string(),
            data: Value::String(contents),
            expires: None,
        }))
    }
}

impl CacheStore for FileCacheStore {
    fn get_all(
        &self,
        key: &str,
        types: &[&str],
        prefix: &str,
    ) -> Result<HashMap<String, CacheEntry>> {
        if key.is_empty() {
            return Err(CacheError::bad_request("No key received by file cache"));
        }
        if types.is_empty() {
            return Err(CacheError::bad_request(
                "File cache needs at least one type to look up",
            ));
        }

        let mut found = HashMap::with_capacity(types.len());
        for cache_type in types {
            if let Some(entry) = self.read_entry(&prefixed_type(prefix, cache_type), key)? {
                found.insert(cache_type.to_string(), entry);
            }
        }
        Ok(found)
    }

    fn get(&self, cache_type: Option<&str>, key: Option<&str>) -> Result<Option<CacheEntry>> {
        let cache_type = require(cache_type)?;
        let key = require(key)?;
        self.read_entry(cache_type, key)
    }

    fn size(&self, cache_type: Option<&str>) -> Result<usize> {
        let (_, dir) = self.type_dir(require(cache_type)?)?;

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::io_with_path(e, &dir)),
        };

        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io_with_path(e, &dir))?;
            // In-flight temp files from atomic writes are hidden.
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let file_type = entry
                .file_type()
                .map_err(|e| CacheError::io_with_path(e, entry.path()))?;
            if file_type.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn delete(&self, cache_type: Option<&str>, key: Option<&str>) -> Result<bool> {
        let path = self.entry_path(require(cache_type)?, require(key)?)?;

        if !path.exists() {
            return Ok(true);
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted cache file {}", path.display());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => {
                warn!("Failed to delete cache file {}: {}", path.display(), e);
            }
        }

        Ok(!path.exists())
    }

    fn gc(&self, _cache_type: Option<&str>) -> Result<bool> {
        Ok(true)
    }

    fn store(&self, cache_type: &str, key: &str, data: &Value, _expires: i64) -> Result<EntryId> {
        let cache_type = require(Some(cache_type))?;
        let key = require(Some(key))?;
        let text = scalar_text(data)?;

        let path = self.entry_path(cache_type, key)?;
        atomic_write(&path, text.as_bytes())?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(EntryId::File(name))
    }

    fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }
}
