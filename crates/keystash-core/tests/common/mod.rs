//! Shared helpers for the integration tests.

#![allow(dead_code)]

use keystash::{open_store, BackendConfig, CacheConfig, CacheStore};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh in-memory database store.
pub fn db_store() -> Box<dyn CacheStore> {
    init_logging();
    let backend = BackendConfig::Database {
        path: BackendConfig::IN_MEMORY.into(),
    };
    open_store(&backend, CacheConfig::default()).expect("Failed to open database cache")
}

/// A fresh file store rooted in a temp directory.
pub fn file_store() -> (TempDir, Box<dyn CacheStore>) {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let backend = BackendConfig::File {
        root: temp_dir.path().join("cache"),
    };
    let store = open_store(&backend, CacheConfig::default()).expect("Failed to open file cache");
    (temp_dir, store)
}

/// One store of each backend, labelled for assertion messages.
pub fn all_stores() -> (TempDir, Vec<(&'static str, Box<dyn CacheStore>)>) {
    let (temp_dir, files) = file_store();
    (temp_dir, vec![("database", db_store()), ("file", files)])
}
