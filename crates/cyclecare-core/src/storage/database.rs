//! SQLite-backed key-value store.
//!
//! Persists the subscription status, the cycle profile and the last applied
//! notification schedule in a single `kv` table.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use super::data_dir;
use super::kv::KeyValueStore;
use crate::error::StorageError;

/// SQLite database for application state.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the database at `~/.config/cyclecare/cyclecare.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::write("data_dir", e))?;
        Self::open_at(&dir.join("cyclecare.db"))
    }

    /// Open the database at a specific path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Locked)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .map_err(|e| StorageError::write("kv", e))?;
        Ok(())
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Locked)?;
        let mut stmt = conn
            .prepare("SELECT value FROM kv WHERE key = ?1")
            .map_err(|e| map_err(key, e, false))?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(map_err(key, e, false)),
        }
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Locked)?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )
        .map_err(|e| map_err(key, e, true))?;
        Ok(())
    }

    fn kv_remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Locked)?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| map_err(key, e, true))?;
        Ok(())
    }
}

fn map_err(key: &str, err: rusqlite::Error, write: bool) -> StorageError {
    if let rusqlite::Error::SqliteFailure(code, _) = &err {
        if code.code == rusqlite::ErrorCode::DatabaseLocked
            || code.code == rusqlite::ErrorCode::DatabaseBusy
        {
            return StorageError::Locked;
        }
    }
    if write {
        StorageError::write(key, err)
    } else {
        StorageError::read(key, err)
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.kv_get(key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.kv_set(key, value)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.kv_remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kv_store() {
        let db = SqliteStore::open_memory().unwrap();
        assert!(db.get("test").await.unwrap().is_none());
        db.set("test", "hello").await.unwrap();
        assert_eq!(db.get("test").await.unwrap().unwrap(), "hello");

        db.set("test", "again").await.unwrap();
        assert_eq!(db.get("test").await.unwrap().unwrap(), "again");

        db.remove("test").await.unwrap();
        assert!(db.get("test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        {
            let db = SqliteStore::open_at(&path).unwrap();
            db.set("subscription_status", "{}").await.unwrap();
        }
        let db = SqliteStore::open_at(&path).unwrap();
        assert_eq!(
            db.get("subscription_status").await.unwrap().as_deref(),
            Some("{}")
        );
    }
}
