//! Store configuration and backend selection.

use crate::cache::{CacheStore, DbCacheStore, FileCacheStore};
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Tuning shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CacheConfig {
    /// TTL applied by `store_default`.
    pub default_ttl: Duration,
    /// How many key digests the file store remembers.
    pub key_hash_capacity: u64,
}

impl CacheConfig {
    /// Default time-to-live for cache entries (2 hours).
    pub const DEFAULT_TTL_SECS: u64 = 7_200;
    /// Default number of memoized key digests.
    pub const DEFAULT_KEY_HASH_CAPACITY: u64 = 10_000;

    fn validate(&self) -> Result<()> {
        if self.key_hash_capacity == 0 {
            return Err(CacheError::Config {
                message: "key_hash_capacity must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(CacheConfig::DEFAULT_TTL_SECS),
            key_hash_capacity: CacheConfig::DEFAULT_KEY_HASH_CAPACITY,
        }
    }
}

/// Which backend to open, and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BackendConfig {
    /// SQLite database file. `:memory:` opens a private in-memory database.
    Database { path: PathBuf },
    /// Directory tree rooted at `root`.
    File { root: PathBuf },
}

impl BackendConfig {
    /// Path used by SQLite for a private in-memory database.
    pub const IN_MEMORY: &'static str = ":memory:";
}

/// Open the store described by `backend`.
pub fn open_store(backend: &BackendConfig, config: CacheConfig) -> Result<Box<dyn CacheStore>> {
    config.validate()?;

    match backend {
        BackendConfig::Database { path } => {
            info!("Opening database cache at {}", path.display());
            let store = if path.as_os_str() == BackendConfig::IN_MEMORY {
                DbCacheStore::open_in_memory()?
            } else {
                DbCacheStore::open(path)?
            };
            Ok(Box::new(store.with_config(config)))
        }
        BackendConfig::File { root } => {
            info!("Opening file cache at {}", root.display());
            Ok(Box::new(FileCacheStore::with_config(root, config)?))
        }
    }
}
