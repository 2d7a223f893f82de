//! `SQLite`-backed implementation of [`CheckpointStore`].
//!
//! Uses a single `Mutex<Connection>`; blocking work runs on the tokio
//! blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use catsync_types::checkpoint::ProgressCheckpoint;
use catsync_types::resource::ResourceType;

use crate::error::{self, StateError};
use crate::store::{CheckpointStore, StoreVersion, VersionedCheckpoint};

/// Idempotent DDL for the checkpoint table.
const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS sync_checkpoints (
    resource_type TEXT PRIMARY KEY,
    last_synced_at TEXT NOT NULL,
    version INTEGER NOT NULL
);
";

/// `SQLite`-backed checkpoint storage.
///
/// Create with [`SqliteCheckpointStore::open`] for file-backed persistence
/// or [`SqliteCheckpointStore::in_memory`] for tests.
pub struct SqliteCheckpointStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckpointStore {
    /// Open or create a `SQLite` checkpoint database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory can't be created, or
    /// [`StateError::Sqlite`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory `SQLite` store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Sqlite`] if the in-memory database can't be
    /// initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock_conn(conn: &Mutex<Connection>) -> error::Result<MutexGuard<'_, Connection>> {
        conn.lock().map_err(|_| StateError::LockPoisoned)
    }

    #[allow(clippy::cast_sign_loss)]
    fn get_blocking(
        conn: &Mutex<Connection>,
        resource_type: &ResourceType,
    ) -> error::Result<Option<VersionedCheckpoint>> {
        let conn = Self::lock_conn(conn)?;
        let result = conn.query_row(
            "SELECT last_synced_at, version FROM sync_checkpoints WHERE resource_type = ?1",
            [resource_type.as_str()],
            |row| {
                let last_synced_at: String = row.get(0)?;
                let version: i64 = row.get(1)?;
                Ok((last_synced_at, version))
            },
        );

        match result {
            Ok((raw_ts, version)) => {
                let last_synced_at = DateTime::parse_from_rfc3339(&raw_ts)
                    .map_err(|e| StateError::store(format!("get: bad stored timestamp: {e}")))?
                    .with_timezone(&Utc);
                Ok(Some(VersionedCheckpoint {
                    checkpoint: ProgressCheckpoint::new(resource_type.clone(), last_synced_at),
                    version: StoreVersion::new(version as u64),
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StateError::Sqlite(e)),
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    fn set_blocking(
        conn: &Mutex<Connection>,
        checkpoint: &ProgressCheckpoint,
        expected: Option<StoreVersion>,
    ) -> error::Result<StoreVersion> {
        let conn = Self::lock_conn(conn)?;
        let last_synced_at = checkpoint.last_synced_at.to_rfc3339();

        let (rows_affected, new_version) = match expected {
            Some(expected_version) => {
                let rows = conn.execute(
                    "UPDATE sync_checkpoints SET last_synced_at = ?1, version = version + 1 \
                     WHERE resource_type = ?2 AND version = ?3",
                    rusqlite::params![
                        last_synced_at,
                        checkpoint.resource_type.as_str(),
                        expected_version.value() as i64,
                    ],
                )?;
                (rows, StoreVersion::new(expected_version.value() + 1))
            }
            None => {
                let rows = conn.execute(
                    "INSERT OR IGNORE INTO sync_checkpoints (resource_type, last_synced_at, version) \
                     VALUES (?1, ?2, 1)",
                    rusqlite::params![checkpoint.resource_type.as_str(), last_synced_at],
                )?;
                (rows, StoreVersion::new(1))
            }
        };

        if rows_affected == 0 {
            return Err(StateError::VersionConflict {
                resource_type: checkpoint.resource_type.clone(),
            });
        }
        Ok(new_version)
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn get(
        &self,
        resource_type: &ResourceType,
    ) -> error::Result<Option<VersionedCheckpoint>> {
        let conn = Arc::clone(&self.conn);
        let resource_type = resource_type.clone();
        tokio::task::spawn_blocking(move || Self::get_blocking(&conn, &resource_type))
            .await
            .map_err(|e| StateError::store(format!("get task panicked: {e}")))?
    }

    async fn set(
        &self,
        checkpoint: &ProgressCheckpoint,
        expected: Option<StoreVersion>,
    ) -> error::Result<StoreVersion> {
        let conn = Arc::clone(&self.conn);
        let checkpoint = checkpoint.clone();
        tokio::task::spawn_blocking(move || Self::set_blocking(&conn, &checkpoint, expected))
            .await
            .map_err(|e| StateError::store(format!("set task panicked: {e}")))?
    }
}
