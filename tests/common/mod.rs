// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use khata::application::LedgerStore;
use khata::domain::{Bank, TxnDraft};
use khata::storage::{KeyValueStore, MemoryStore, StorageError};

/// Helper to create a store over fresh in-memory storage.
/// Returns a second handle to the same storage for inspection.
pub fn test_store() -> (LedgerStore<MemoryStore>, MemoryStore) {
    let storage = MemoryStore::new();
    let store = LedgerStore::open(storage.clone());
    (store, storage)
}

/// Helper to create a store with no banks at all.
pub fn empty_store() -> LedgerStore<MemoryStore> {
    let (mut store, _) = test_store();
    for bank in store.list_banks() {
        store.remove_bank(&bank.id);
    }
    store
}

/// Storage that can be read but refuses every write.
#[derive(Debug, Clone, Default)]
pub struct ReadOnlyStore {
    pub inner: MemoryStore,
}

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("read-only".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("read-only".into()))
    }
}

/// Storage whose reads always fail.
#[derive(Debug, Clone, Default)]
pub struct BrokenReadStore;

impl KeyValueStore for BrokenReadStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("disk on fire".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Test fixture: a pair of banks with some activity
pub struct StandardBanks {
    pub savings: Bank,
    pub current: Bank,
}

impl StandardBanks {
    /// Create Savings (opening 1000) and Current (opening 0) on an empty store
    pub fn create<S: KeyValueStore>(store: &mut LedgerStore<S>) -> Self {
        let savings = store.add_bank("Savings", 1000.0);
        let current = store.add_bank("Current", 0.0);
        Self { savings, current }
    }

    /// Salary into Savings, rent out of Current, and a transfer between them
    pub fn with_activity<S: KeyValueStore>(store: &mut LedgerStore<S>) -> Self {
        let banks = Self::create(store);
        store.add_txn(
            TxnDraft::new("income", 5000.0)
                .with_bank(banks.savings.id.clone())
                .with_category("salary")
                .with_date("01-01-2024"),
        );
        store.add_txn(
            TxnDraft::new("expense", 1200.0)
                .with_bank(banks.current.id.clone())
                .with_category("rent")
                .with_date("05-01-2024"),
        );
        store.transfer(
            Some(banks.savings.id.as_str()),
            Some(banks.current.id.as_str()),
            2000.0,
            Some("03-01-2024"),
            "top up",
        );
        banks
    }
}
