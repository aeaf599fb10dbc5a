//! keystash - a key-value cache contract with interchangeable backends.
//!
//! Entries are addressed by a (type, key) pair and carry an absolute expiry.
//! Two backends ship with the crate: a SQLite table that stores any JSON
//! payload, and a directory tree that stores scalar values as plain files.
//!
//! # Example
//!
//! ```rust,no_run
//! use keystash::{open_store, BackendConfig, CacheConfig};
//! use serde_json::json;
//!
//! fn main() -> keystash::Result<()> {
//!     let backend = BackendConfig::Database { path: "cache.sqlite".into() };
//!     let cache = open_store(&backend, CacheConfig::default())?;
//!
//!     cache.store_default("user", "42", &json!({"name": "ada"}))?;
//!     if let Some(entry) = cache.get(Some("user"), Some("42"))? {
//!         println!("cached: {}", entry.data);
//!     }
//!
//!     cache.gc(None)?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheStore, DbCacheStore, EntryId, FileCacheStore};
pub use config::{open_store, BackendConfig, CacheConfig};
pub use error::{CacheError, Result};
