//! Persistence backend for the session store
//!
//! The store persists its whole state as one JSON blob under a single key,
//! so the backend contract is a minimal durable key -> blob interface:
//! `init`, `get`, `set`. Either call may fail; the store degrades rather
//! than propagating those failures (see [`crate::store`]).
//!
//! Two implementations ship here: [`SqliteBackend`] for production and
//! [`MemoryBackend`] for tests, the latter with failure injection to
//! exercise the degraded paths.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Durable key -> blob storage.
///
/// Implementations must be safe to call from the store's writer task and
/// from `init` concurrently with nothing else; the store itself serializes
/// all writes.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Prepare the backend (create tables, directories, ...).
    async fn init(&self) -> Result<()>;

    /// Fetch the blob stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Durably store `value` under `key`, replacing any previous blob.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;
}

// ============================================
// SQLite backend
// ============================================

/// Production backend: a single-table key/value SQLite database.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database at `path`, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for tests and ephemeral runs).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Store("sqlite connection mutex poisoned".to_string()))
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn init(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      BLOB NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

// ============================================
// In-memory backend (tests)
// ============================================

/// In-memory backend with failure injection for tests.
#[derive(Default)]
pub struct MemoryBackend {
    data: Mutex<HashMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `get` calls fail (init-time degradation tests).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `set` calls fail (write-failure tests).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw blob currently stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.data
            .lock()
            .map(|d| d.get(key).cloned())
            .unwrap_or(None)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Store("injected read failure".to_string()));
        }
        let data = self
            .data
            .lock()
            .map_err(|_| Error::Store("memory backend mutex poisoned".to_string()))?;
        Ok(data.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Store("injected write failure".to_string()));
        }
        let mut data = self
            .data
            .lock()
            .map_err(|_| Error::Store("memory backend mutex poisoned".to_string()))?;
        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
