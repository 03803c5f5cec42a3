//! SQLite snapshot store
//!
//! Schema:
//! - store_metadata: key/value rows, holds the schema version
//! - snapshots: one row per `domain:user` key with the JSON value
//!
//! Batches run inside a single transaction so multi-domain mutations
//! land together.

use super::{Snapshot, SnapshotKey, SnapshotStore};
use crate::error::CoreError;
use crate::session::UserId;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Current schema version
///
/// Version History:
/// - v1: Initial version
const SCHEMA_VERSION: i32 = 1;

pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

fn storage(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> CoreError {
    move |source| CoreError::Storage { operation, source }
}

impl SqliteSnapshotStore {
    /// Create or open the database at `path`
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(storage("open"))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(storage("enable WAL"))?;

        let store = Self::init(conn, Some(path.to_path_buf()))?;
        debug!(path = %path.display(), "Snapshot store opened");
        Ok(store)
    }

    /// Non-durable database, useful for tests
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(storage("open"))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, CoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS store_metadata (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS snapshots (
                key TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                domain TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_snapshots_user ON snapshots(user_id);
            "#,
        )
        .map_err(storage("create schema"))?;

        let stored_version: Option<i32> = conn
            .query_row(
                "SELECT value FROM store_metadata WHERE key = 'version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage("read schema version"))?;

        match stored_version {
            Some(v) if v != SCHEMA_VERSION => {
                // Snapshots are plain JSON, newer schemas only add columns
                warn!(
                    stored = v,
                    current = SCHEMA_VERSION,
                    "Snapshot store schema version differs"
                );
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "INSERT INTO store_metadata (key, value) VALUES ('version', ?)",
                    params![SCHEMA_VERSION],
                )
                .map_err(storage("write schema version"))?;
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Location on disk (None for in-memory stores)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored snapshots
    pub fn count(&self) -> Result<usize, CoreError> {
        let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))
            .map_err(storage("count"))?;
        Ok(count as usize)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load(&self, key: &SnapshotKey) -> Result<Option<String>, CoreError> {
        let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        conn.query_row(
            "SELECT value FROM snapshots WHERE key = ?",
            params![key.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage("load"))
    }

    fn save_batch(&self, snapshots: &[Snapshot]) -> Result<(), CoreError> {
        let mut conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        let tx = conn.transaction().map_err(storage("begin"))?;
        let now = Utc::now().to_rfc3339();

        for snapshot in snapshots {
            tx.execute(
                r#"INSERT INTO snapshots (key, user_id, domain, value, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5)
                   ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                  updated_at = excluded.updated_at"#,
                params![
                    snapshot.key.to_string(),
                    snapshot.key.user.as_str(),
                    snapshot.key.domain.as_str(),
                    snapshot.value,
                    now
                ],
            )
            .map_err(storage("save"))?;
        }

        tx.commit().map_err(storage("commit"))?;
        Ok(())
    }

    fn remove_user(&self, user: &UserId) -> Result<usize, CoreError> {
        let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        let removed = conn
            .execute(
                "DELETE FROM snapshots WHERE user_id = ?",
                params![user.as_str()],
            )
            .map_err(storage("remove user"))?;
        debug!(user = %user, removed, "Removed user snapshots");
        Ok(removed)
    }
}
