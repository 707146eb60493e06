//! Key-value storage backends.
//!
//! Each key holds one string blob and a revision that increases by one on
//! every successful put. Writers may pass the revision they read to get a
//! compare-and-swap; passing `None` is last-writer-wins.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;

use crate::errors::AppError;

/// Key of the queue document.
pub const DATA_KEY: &str = "imtsb_realtime_data_v1";
/// Key of the session record.
pub const SESSION_KEY: &str = "imtsb_session_v1";

/// A stored blob and its revision.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub value: String,
    pub revision: i64,
}

/// Local key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the blob stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, AppError>;

    /// Store `value` under `key` and return the new revision.
    ///
    /// `expected_revision` of `Some(0)` requires the key to be absent;
    /// `Some(n)` requires the stored revision to be `n`.
    async fn put(
        &self,
        key: &str,
        value: &str,
        expected_revision: Option<i64>,
    ) -> Result<i64, AppError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), AppError>;

    /// Current revision of `key`, if present.
    async fn revision(&self, key: &str) -> Result<Option<i64>, AppError>;
}

fn conflict(key: &str, expected: i64, current: i64) -> AppError {
    AppError::Conflict {
        message: format!(
            "Version mismatch on {}: expected {}, current {}",
            key, expected, current
        ),
        current_version: current,
    }
}

/// SQLite-backed key-value store.
#[derive(Clone)]
pub struct SqliteKv {
    pool: SqlitePool,
}

impl SqliteKv {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKv {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, AppError> {
        let row = sqlx::query("SELECT value, revision FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| StoredValue {
            value: row.get("value"),
            revision: row.get("revision"),
        }))
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        expected_revision: Option<i64>,
    ) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();

        let row = match expected_revision {
            None => {
                sqlx::query(
                    "INSERT INTO kv_store (key, value, revision, updated_at) VALUES (?, ?, 1, ?) \
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
                     revision = kv_store.revision + 1, updated_at = excluded.updated_at \
                     RETURNING revision",
                )
                .bind(key)
                .bind(value)
                .bind(&now)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(0) => {
                sqlx::query(
                    "INSERT INTO kv_store (key, value, revision, updated_at) VALUES (?, ?, 1, ?) \
                     ON CONFLICT(key) DO NOTHING RETURNING revision",
                )
                .bind(key)
                .bind(value)
                .bind(&now)
                .fetch_optional(&self.pool)
                .await?
            }
            // Conditional UPDATE so a concurrent writer cannot slip in between read and write
            Some(expected) => {
                sqlx::query(
                    "UPDATE kv_store SET value = ?, revision = revision + 1, updated_at = ? \
                     WHERE key = ? AND revision = ? RETURNING revision",
                )
                .bind(value)
                .bind(&now)
                .bind(key)
                .bind(expected)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match row {
            Some(row) => Ok(row.get("revision")),
            None => {
                let current = self.revision(key).await?.unwrap_or(0);
                Err(conflict(key, expected_revision.unwrap_or(0), current))
            }
        }
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revision(&self, key: &str) -> Result<Option<i64>, AppError> {
        let row = sqlx::query("SELECT revision FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("revision")))
    }
}

/// In-memory key-value store, used by tests and throwaway simulations.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, AppError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        expected_revision: Option<i64>,
    ) -> Result<i64, AppError> {
        let mut entries = self.entries.write().await;
        let current = entries.get(key).map(|e| e.revision).unwrap_or(0);

        if let Some(expected) = expected_revision {
            if expected != current {
                return Err(conflict(key, expected, current));
            }
        }

        let revision = current + 1;
        entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                revision,
            },
        );
        Ok(revision)
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn revision(&self, key: &str) -> Result<Option<i64>, AppError> {
        Ok(self.entries.read().await.get(key).map(|e| e.revision))
    }
}
