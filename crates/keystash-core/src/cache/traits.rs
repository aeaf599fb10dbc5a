//! Cache contract and entry types.

use crate::config::CacheConfig;
use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// A cached record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Category the entry belongs to.
    #[serde(rename = "type")]
    pub cache_type: String,
    /// Identifier of the entity within its type.
    pub key: String,
    /// The cached payload.
    pub data: Value,
    /// Unix timestamp after which the entry is gone.
    ///
    /// `None` for backends that do not track expiry (the file store).
    pub expires: Option<i64>,
}

/// Identifier handed back by [`CacheStore::store`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    /// Row id assigned by the database.
    Row(i64),
    /// Base name of the file holding the entry.
    File(String),
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryId::Row(id) => write!(f, "{}", id),
            EntryId::File(name) => f.write_str(name),
        }
    }
}

/// Current time as a Unix timestamp.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Key-value cache contract shared by every backend.
///
/// Entries are addressed by a (type, key) pair. Reads report misses as `None`
/// rather than errors; a miss covers absent, expired and corrupted entries
/// alike. All operations are synchronous and return once the backing resource
/// has completed the call.
pub trait CacheStore: Send + Sync {
    /// Get the entries of several types for a single key.
    ///
    /// `prefix` is prepended to every type for the lookup and stripped again
    /// from the keys of the returned map. Types that are absent or expired are
    /// left out of the map.
    fn get_all(
        &self,
        key: &str,
        types: &[&str],
        prefix: &str,
    ) -> Result<HashMap<String, CacheEntry>>;

    /// Get a single entry.
    ///
    /// An expired entry is deleted before `None` is returned.
    fn get(&self, cache_type: Option<&str>, key: Option<&str>) -> Result<Option<CacheEntry>>;

    /// Number of stored entries, optionally restricted to one type.
    fn size(&self, cache_type: Option<&str>) -> Result<usize>;

    /// Delete the entries matching the given type and key.
    ///
    /// Omitted fields match everything. Deleting nothing is a success.
    fn delete(&self, cache_type: Option<&str>, key: Option<&str>) -> Result<bool>;

    /// Delete every expired entry, optionally restricted to one type.
    fn gc(&self, cache_type: Option<&str>) -> Result<bool>;

    /// Store an entry that expires at the Unix timestamp `expires`.
    ///
    /// Replaces any existing entry with the same type and key.
    fn store(&self, cache_type: &str, key: &str, data: &Value, expires: i64) -> Result<EntryId>;

    /// TTL used by [`CacheStore::store_default`].
    fn default_ttl(&self) -> Duration {
        Duration::from_secs(CacheConfig::DEFAULT_TTL_SECS)
    }

    /// Store an entry that expires `ttl` from now.
    fn store_for(
        &self,
        cache_type: &str,
        key: &str,
        data: &Value,
        ttl: Duration,
    ) -> Result<EntryId> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.store(cache_type, key, data, unix_now().saturating_add(ttl_secs))
    }

    /// Store an entry with the store's default TTL.
    fn store_default(&self, cache_type: &str, key: &str, data: &Value) -> Result<EntryId> {
        self.store_for(cache_type, key, data, self.default_ttl())
    }
}
