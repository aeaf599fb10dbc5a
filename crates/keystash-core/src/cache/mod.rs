//! Cache contract and its backends.
//!
//! - [`DbCacheStore`]: SQLite table, any JSON payload, expiry enforced on read
//!   and by `gc`.
//! - [`FileCacheStore`]: one file per entry, scalar payloads only, no expiry.
//!
//! Both implement [`CacheStore`], so callers pick a backend once at
//! construction and use it through the trait afterwards.

mod atomic;
mod file;
mod keys;
mod sqlite;
mod traits;

pub use file::FileCacheStore;
pub use keys::{hash_key, sanitize_type, KeyHasher};
pub use sqlite::DbCacheStore;
pub use traits::{unix_now, CacheEntry, CacheStore, EntryId};
