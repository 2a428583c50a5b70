mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use thiserror::Error;

/// SQL migration for the key-value table
pub const MIGRATION_001_KV_STORE: &str = include_str!("migrations/001_kv_store.sql");

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// A durable string-to-string slot map, the only thing the ledger needs from
/// its persistence layer.
pub trait KeyValueStore {
    /// Read the value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
