//! Type and key helpers shared by the backends.

use mini_moka::sync::Cache;
use sha2::{Digest, Sha256};

/// Strip a type down to ASCII alphanumerics so it is safe as a directory name.
pub fn sanitize_type(cache_type: &str) -> String {
    cache_type
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Attach `prefix` to a requested type.
pub fn prefixed_type(prefix: &str, cache_type: &str) -> String {
    format!("{}{}", prefix, cache_type)
}

/// Remove `prefix` from a stored type, if it is there.
pub fn unprefixed_type<'a>(prefix: &str, stored_type: &'a str) -> &'a str {
    if prefix.is_empty() {
        return stored_type;
    }
    stored_type.strip_prefix(prefix).unwrap_or(stored_type)
}

/// Hex SHA-256 digest of a cache key.
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Memoizing key hasher.
///
/// Holds at most `capacity` digests and lives as long as the store that owns
/// it.
pub struct KeyHasher {
    memo: Cache<String, String>,
}

impl KeyHasher {
    /// Create a hasher that remembers up to `capacity` keys.
    pub fn new(capacity: u64) -> Self {
        Self {
            memo: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Hash `key`, reusing a previous result when there is one.
    pub fn hash(&self, key: &str) -> String {
        let key = key.to_string();
        if let Some(digest) = self.memo.get(&key) {
            return digest;
        }
        let digest = hash_key(&key);
        self.memo.insert(key, digest.clone());
        digest
    }
}
