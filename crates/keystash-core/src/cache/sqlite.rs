//! SQLite-backed cache store.

use super::keys::{prefixed_type, unprefixed_type};
use super::traits::{unix_now, CacheEntry, CacheStore, EntryId};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error};

const SELECT_ENTRY: &str = r#"SELECT id, "type", "key", data, expires FROM cache"#;

/// A row as stored, before the payload is decoded.
struct StoredRow {
    id: i64,
    cache_type: String,
    key: String,
    data: Vec<u8>,
    expires: i64,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            cache_type: row.get(1)?,
            key: row.get(2)?,
            data: row.get(3)?,
            expires: row.get(4)?,
        })
    }

    fn is_expired_at(&self, now: i64) -> bool {
        self.expires <= now
    }
}

/// WHERE clause assembled from optional column filters.
#[derive(Default)]
struct Filter {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl Filter {
    fn eq(mut self, column: &str, value: &str) -> Self {
        self.clauses.push(format!(r#""{}" = ?"#, column));
        self.params.push(SqlValue::Text(value.to_string()));
        self
    }

    /// Filter on `column` only when a non-empty value is given.
    fn eq_opt(self, column: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) if !value.is_empty() => self.eq(column, value),
            _ => self,
        }
    }

    fn any_of(mut self, column: &str, values: Vec<String>) -> Self {
        if values.is_empty() {
            return self;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.clauses
            .push(format!(r#""{}" IN ({})"#, column, placeholders));
        self.params.extend(values.into_iter().map(SqlValue::Text));
        self
    }

    fn expired(mut self, now: i64) -> Self {
        self.clauses.push("expires <= ?".to_string());
        self.params.push(SqlValue::Integer(now));
        self
    }

    fn live(mut self, now: i64) -> Self {
        self.clauses.push("expires > ?".to_string());
        self.params.push(SqlValue::Integer(now));
        self
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Cache store backed by a single SQLite table.
///
/// Payloads are stored as their JSON encoding in a blob column, so structured
/// values round-trip with their types intact. The connection is shared behind
/// a mutex so a store can be handed across threads; the cache itself does no
/// further coordination.
pub struct DbCacheStore {
    /// Database connection (wrapped for thread safety).
    conn: Arc<Mutex<Connection>>,
    /// Cache configuration.
    config: CacheConfig,
}

impl DbCacheStore {
    /// Wrap an existing connection.
    ///
    /// Creates the `cache` table if it doesn't exist.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Result<Self> {
        let store = Self {
            conn,
            config: CacheConfig::default(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open (or create) a database file.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                message: format!("Failed to create cache directory: {}", e),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| CacheError::Database {
            message: format!("Failed to open cache database: {}", e),
            source: Some(e),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| CacheError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;

        Self::new(Arc::new(Mutex::new(conn)))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| CacheError::Database {
            message: format!("Failed to open in-memory cache database: {}", e),
            source: Some(e),
        })?;
        Self::new(Arc::new(Mutex::new(conn)))
    }

    /// Replace the store's configuration.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Create the `cache` table and its indexes if they don't exist.
    pub fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                "type" TEXT NOT NULL,
                "key" TEXT NOT NULL,
                data BLOB NOT NULL,
                expires INTEGER NOT NULL
            );

            -- One entry per (type, key)
            CREATE UNIQUE INDEX IF NOT EXISTS idx_cache_type_key
                ON cache("type", "key");

            -- Index for gc
            CREATE INDEX IF NOT EXISTS idx_cache_expires
                ON cache(expires);
            "#,
        )
        .map_err(|e| CacheError::Database {
            message: format!("Failed to initialize cache schema: {}", e),
            source: Some(e),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| CacheError::Database {
            message: format!("Failed to lock database: {}", e),
            source: None,
        })
    }

    fn delete_row(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM cache WHERE id = ?1", params![id])
            .map_err(|e| CacheError::Database {
                message: format!("Failed to delete cache row {}: {}", id, e),
                source: Some(e),
            })?;
        Ok(())
    }

    /// Turn a stored row into an entry, or drop it if it is expired or corrupt.
    fn resolve(conn: &Connection, row: StoredRow, now: i64) -> Result<Option<CacheEntry>> {
        if row.is_expired_at(now) {
            Self::delete_row(conn, row.id)?;
            return Ok(None);
        }

        match serde_json::from_slice::<Value>(&row.data) {
            Ok(data) => Ok(Some(CacheEntry {
                cache_type: row.cache_type,
                key: row.key,
                data,
                expires: Some(row.expires),
            })),
            Err(e) => {
                error!(
                    "Error decoding cache record with type {} and key {}, error: {}",
                    row.cache_type, row.key, e
                );
                Self::delete_row(conn, row.id)?;
                Ok(None)
            }
        }
    }
}

impl CacheStore for DbCacheStore {
    fn get_all(
        &self,
        key: &str,
        types: &[&str],
        prefix: &str,
    ) -> Result<HashMap<String, CacheEntry>> {
        let conn = self.lock()?;
        let now = unix_now();

        let filter = Filter::default().eq("key", key).any_of(
            "type",
            types.iter().map(|t| prefixed_type(prefix, t)).collect(),
        );

        let rows: Vec<StoredRow> = {
            let mut stmt = conn
                .prepare(&format!("{}{} ORDER BY id", SELECT_ENTRY, filter.where_sql()))
                .map_err(|e| CacheError::Database {
                    message: format!("Failed to prepare cache query: {}", e),
                    source: Some(e),
                })?;
            let rows = stmt
                .query_map(params_from_iter(filter.params.iter()), StoredRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut found = HashMap::with_capacity(rows.len());
        for row in rows {
            if let Some(entry) = Self::resolve(&conn, row, now)? {
                let result_type = unprefixed_type(prefix, &entry.cache_type).to_string();
                found.insert(result_type, entry);
            }
        }

        Ok(found)
    }

    fn get(&self, cache_type: Option<&str>, key: Option<&str>) -> Result<Option<CacheEntry>> {
        let conn = self.lock()?;
        let now = unix_now();

        let filter = Filter::default()
            .eq_opt("type", cache_type)
            .eq_opt("key", key);

        let row = conn
            .query_row(
                &format!(
                    "{}{} ORDER BY id LIMIT 1",
                    SELECT_ENTRY,
                    filter.where_sql()
                ),
                params_from_iter(filter.params.iter()),
                StoredRow::from_row,
            )
            .optional()
            .map_err(|e| CacheError::Database {
                message: format!("Failed to query cache entry: {}", e),
                source: Some(e),
            })?;

        match row {
            Some(row) => Self::resolve(&conn, row, now),
            None => Ok(None),
        }
    }

    fn size(&self, cache_type: Option<&str>) -> Result<usize> {
        let conn = self.lock()?;

        let filter = Filter::default()
            .live(unix_now())
            .eq_opt("type", cache_type);

        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(id) FROM cache{}", filter.where_sql()),
                params_from_iter(filter.params.iter()),
                |row| row.get(0),
            )
            .map_err(|e| CacheError::Database {
                message: format!("Failed to count cache entries: {}", e),
                source: Some(e),
            })?;

        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn delete(&self, cache_type: Option<&str>, key: Option<&str>) -> Result<bool> {
        let conn = self.lock()?;

        let filter = Filter::default()
            .eq_opt("type", cache_type)
            .eq_opt("key", key);

        let deleted = conn
            .execute(
                &format!("DELETE FROM cache{}", filter.where_sql()),
                params_from_iter(filter.params.iter()),
            )
            .map_err(|e| CacheError::Database {
                message: format!("Failed to delete cache entries: {}", e),
                source: Some(e),
            })?;

        debug!("Deleted {} cache entries", deleted);
        Ok(true)
    }

    fn gc(&self, cache_type: Option<&str>) -> Result<bool> {
        let conn = self.lock()?;

        let filter = Filter::default()
            .expired(unix_now())
            .eq_opt("type", cache_type);

        let deleted = conn
            .execute(
                &format!("DELETE FROM cache{}", filter.where_sql()),
                params_from_iter(filter.params.iter()),
            )
            .map_err(|e| CacheError::Database {
                message: format!("Failed to cleanup expired entries: {}", e),
                source: Some(e),
            })?;

        if deleted > 0 {
            debug!("Cleaned up {} expired cache entries", deleted);
        }

        Ok(true)
    }

    fn store(&self, cache_type: &str, key: &str, data: &Value, expires: i64) -> Result<EntryId> {
        let blob = serde_json::to_vec(data).map_err(|e| CacheError::Json {
            message: format!("Failed to serialize cache payload: {}", e),
            source: Some(e),
        })?;

        let conn = self.lock()?;

        // REPLACE drops the old (type, key) row and inserts a fresh one in a
        // single statement.
        conn.execute(
            r#"
            INSERT OR REPLACE INTO cache ("type", "key", data, expires)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![cache_type, key, blob, expires],
        )
        .map_err(|e| CacheError::Database {
            message: format!("Failed to store cache entry: {}", e),
            source: Some(e),
        })?;

        let id = conn.last_insert_rowid();
        debug!("Stored cache entry {} ({}/{})", id, cache_type, key);
        Ok(EntryId::Row(id))
    }

    fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }
}
