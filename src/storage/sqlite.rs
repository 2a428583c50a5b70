use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tokio::runtime::{Builder, Runtime};

use super::{KeyValueStore, MIGRATION_001_KV_STORE, StorageError};

/// Key-value storage in a SQLite file.
///
/// The ledger API is synchronous, so the store owns a current-thread tokio
/// runtime and blocks on each query.
pub struct SqliteStore {
    pool: SqlitePool,
    runtime: Runtime,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`.
    pub fn open(path: &str) -> Result<Self> {
        Self::connect(&format!("sqlite:{}?mode=rwc", path))
    }

    /// Connect to a SQLite database URL and run migrations.
    pub fn connect(database_url: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start storage runtime")?;
        let pool = runtime
            .block_on(SqlitePool::connect(database_url))
            .context("Failed to connect to database")?;

        let store = Self { pool, runtime };
        store.migrate()?;
        Ok(store)
    }

    /// Run database migrations.
    pub fn migrate(&self) -> Result<()> {
        self.runtime.block_on(async {
            sqlx::query(MIGRATION_001_KV_STORE)
                .execute(&self.pool)
                .await
                .context("Failed to run migration 001")?;
            Ok::<_, anyhow::Error>(())
        })
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.runtime.block_on(async {
            let rows = sqlx::query("SELECT key FROM kv_store ORDER BY key")
                .fetch_all(&self.pool)
                .await
                .context("Failed to list keys")?;
            let keys: Vec<String> = rows.iter().map(|row| row.get::<String, _>("key")).collect();
            Ok::<_, anyhow::Error>(keys)
        })
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read value")?;
        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    async fn upsert(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to write value")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .context("Failed to delete value")?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.runtime.block_on(self.fetch(key))?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.runtime.block_on(self.upsert(key, value))?)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Ok(self.runtime.block_on(self.delete(key))?)
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        // Close connections while the runtime is still alive.
        self.runtime.block_on(self.pool.close());
    }
}
