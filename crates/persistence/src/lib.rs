#![deny(warnings)]

//! Persistence layer: snapshot storage for room economies.
//!
//! Snapshots are JSON documents keyed by name. `room:<name>` holds one room,
//! `economy:all` the whole store. SQLite is the durable backend; an
//! in-memory map serves tests and ephemeral runs.

use chrono::Utc;
use sim_core::{RoomName, RoomSnapshot, StoreSnapshot};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Key of the aggregate snapshot covering every room.
pub const AGGREGATE_KEY: &str = "economy:all";

/// Errors raised by snapshot storage.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/economy.db"
}

/// Storage key of one room.
pub fn room_key(room: &RoomName) -> String {
    format!("room:{room}")
}

/// Create the parent directory of a file-backed SQLite URL.
pub fn ensure_parent_dir(url: &str) -> Result<()> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"));
    match path {
        Some(p) if !p.starts_with(":memory:") => {
            if let Some(parent) = Path::new(p).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Open (creating if needed) the SQLite database and run migrations.
pub async fn init_db(url: &str) -> Result<SqlitePool> {
    let in_memory = url.contains(":memory:");
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    // Every connection to `:memory:` is a distinct database.
    let max = if in_memory { 1 } else { 4 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max)
        .connect_with(options)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!(url, "snapshot database ready");
    Ok(pool)
}

/// Key/value snapshot store.
#[derive(Clone, Debug)]
pub enum SnapshotStore {
    Sqlite(SqlitePool),
    Memory(Arc<Mutex<HashMap<String, String>>>),
}

impl SnapshotStore {
    /// Open a SQLite-backed store at `url`.
    pub async fn open(url: &str) -> Result<Self> {
        ensure_parent_dir(url)?;
        Ok(Self::Sqlite(init_db(url).await?))
    }

    /// Volatile store kept in process memory.
    pub fn memory() -> Self {
        Self::Memory(Arc::default())
    }

    async fn put(&self, key: &str, payload: String) -> Result<()> {
        match self {
            Self::Sqlite(pool) => {
                sqlx::query(
                    "INSERT INTO economy_snapshots (key, payload, saved_at) VALUES (?, ?, ?) \
                     ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, saved_at = excluded.saved_at",
                )
                .bind(key)
                .bind(payload)
                .bind(Utc::now().to_rfc3339())
                .execute(pool)
                .await?;
            }
            Self::Memory(map) => {
                map.lock().await.insert(key.to_string(), payload);
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Self::Sqlite(pool) => {
                let row: Option<(String,)> =
                    sqlx::query_as("SELECT payload FROM economy_snapshots WHERE key = ?")
                        .bind(key)
                        .fetch_optional(pool)
                        .await?;
                Ok(row.map(|(payload,)| payload))
            }
            Self::Memory(map) => Ok(map.lock().await.get(key).cloned()),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        match self {
            Self::Sqlite(pool) => {
                let done = sqlx::query("DELETE FROM economy_snapshots WHERE key = ?")
                    .bind(key)
                    .execute(pool)
                    .await?;
                Ok(done.rows_affected() > 0)
            }
            Self::Memory(map) => Ok(map.lock().await.remove(key).is_some()),
        }
    }

    pub async fn save_room(&self, snapshot: &RoomSnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        self.put(&room_key(&snapshot.room_name), payload).await?;
        debug!(room = %snapshot.room_name, "room snapshot saved");
        Ok(())
    }

    pub async fn load_room(&self, room: &RoomName) -> Result<Option<RoomSnapshot>> {
        match self.get(&room_key(room)).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Remove a room snapshot; returns whether one existed.
    pub async fn delete_room(&self, room: &RoomName) -> Result<bool> {
        self.remove(&room_key(room)).await
    }

    pub async fn save_aggregate(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        self.put(AGGREGATE_KEY, payload).await?;
        debug!(rooms = snapshot.rooms.len(), "aggregate snapshot saved");
        Ok(())
    }

    pub async fn load_aggregate(&self) -> Result<Option<StoreSnapshot>> {
        match self.get(AGGREGATE_KEY).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}
