mod common;

use anyhow::Result;
use common::{BrokenReadStore, ReadOnlyStore, StandardBanks, empty_store, test_store};
use khata::application::{LedgerStore, STORAGE_KEY};
use khata::domain::{TxnDraft, TxnKind, TxnPatch};
use khata::storage::{KeyValueStore, MemoryStore, SqliteStore};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn test_open_persists_fresh_defaults() -> Result<()> {
    let (store, storage) = test_store();

    let blob = storage.get(STORAGE_KEY)?.expect("fresh ledger is written");
    let value: Value = serde_json::from_str(&blob)?;
    assert_eq!(value["banks"].as_array().map(Vec::len), Some(12));
    assert_eq!(value["txns"].as_array().map(Vec::len), Some(0));
    assert!(value["meta"]["createdAt"].is_string());
    assert_eq!(store.list_banks().len(), 12);
    Ok(())
}

#[test]
fn test_reopen_sees_every_mutation() {
    let (mut store, storage) = test_store();
    let bank = store.add_bank("Wallet", 20.0);
    let txn = store.add_txn(TxnDraft::new("expense", 5.0).with_bank(bank.id.clone()));
    let expected = store.state();

    let reopened = LedgerStore::open(storage);
    assert_eq!(reopened.state(), expected);
    assert_eq!(reopened.find_txn(&txn.id), Some(txn));
}

#[test]
fn test_reopen_keeps_sub_millisecond_dates_stable() {
    let (mut store, storage) = test_store();
    let txn = store.add_txn(TxnDraft::new("expense", 3.0).with_date("2024-03-15T10:30:00.123456+05:30"));
    store.update_txn(
        &txn.id,
        TxnPatch {
            date: chrono::DateTime::from_timestamp(1_710_000_000, 999_999_999),
            ..Default::default()
        },
    );
    let expected = store.list_txns();

    let reopened = LedgerStore::open(storage);
    assert_eq!(reopened.list_txns(), expected);
}

#[test]
fn test_stored_blob_uses_wire_names() -> Result<()> {
    let (mut store, storage) = test_store();
    store.transfer(None, None, 10.0, Some("01-03-2024"), "move");

    let value: Value = serde_json::from_str(&storage.get(STORAGE_KEY)?.unwrap_or_default())?;
    let txn = &value["txns"][0];
    assert_eq!(txn["type"], "transfer");
    assert_eq!(txn["date"], "2024-03-01T00:00:00.000Z");
    assert!(txn["bankId"].is_null());
    assert!(txn.get("kind").is_none());
    Ok(())
}

#[test]
fn test_corrupt_blob_falls_back_to_defaults() {
    let storage = MemoryStore::with_value(STORAGE_KEY, "not json {");
    let store = LedgerStore::open(storage.clone());

    assert_eq!(store.list_banks().len(), 12);
    assert!(store.list_txns().is_empty());

    // The corrupt blob was replaced with the defaults
    let reopened = LedgerStore::open(storage);
    assert_eq!(reopened.state(), store.state());
}

#[test]
fn test_wrong_shape_falls_back_to_defaults() {
    for blob in [
        r#"{"banks": {}, "txns": []}"#,
        r#"{"banks": []}"#,
        r#"[1, 2, 3]"#,
        "null",
    ] {
        let store = LedgerStore::open(MemoryStore::with_value(STORAGE_KEY, blob));
        assert_eq!(store.list_banks().len(), 12, "blob: {blob}");
        assert!(store.list_txns().is_empty(), "blob: {blob}");
    }
}

#[test]
fn test_tolerant_load_fills_missing_fields() {
    let blob = r#"{
        "banks": [{"id": "b1", "name": "Locker"}],
        "txns": [
            {"id": "t1", "type": "expense", "amount": "42", "bankId": "b1"},
            {"amount": 7, "date": "31-12-2023"}
        ]
    }"#;
    let store = LedgerStore::open(MemoryStore::with_value(STORAGE_KEY, blob));

    let bank = store.find_bank("b1").unwrap();
    assert_eq!(bank.opening, 0.0);

    let txns = store.list_txns();
    assert_eq!(txns.len(), 2);
    assert_eq!(txns[0].kind, TxnKind::Expense);
    assert_eq!(txns[0].amount, 42.0);
    assert_eq!(txns[0].category, "");
    assert_eq!(txns[1].kind, TxnKind::Income);
    assert!(!txns[1].id.is_empty());
    assert!(store.state().meta.created_at.is_none());
    assert_eq!(store.balances_per_bank()[0].balance, -42.0);
}

#[test]
fn test_write_failures_keep_memory_state() {
    let storage = ReadOnlyStore::default();
    let mut store = LedgerStore::open(storage.clone());

    let bank = store.add_bank("Wallet", 0.0);
    store.add_txn(TxnDraft::new("income", 9.0).with_bank(bank.id.clone()));

    assert_eq!(store.list_banks().len(), 13);
    assert_eq!(store.totals().income, 9.0);
    assert!(storage.inner.is_empty());
}

#[test]
fn test_read_failure_falls_back_to_defaults() {
    let store = LedgerStore::open(BrokenReadStore);
    assert_eq!(store.list_banks().len(), 12);
    assert!(store.list_txns().is_empty());
}

#[test]
fn test_sqlite_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("khata.db");
    let path = path.to_str().unwrap();

    let expected = {
        let mut store = LedgerStore::open(SqliteStore::open(path)?);
        for bank in store.list_banks() {
            store.remove_bank(&bank.id);
        }
        StandardBanks::create(&mut store);
        store.state()
    };

    let store = LedgerStore::open(SqliteStore::open(path)?);
    assert_eq!(store.state(), expected);
    assert_eq!(store.list_banks().len(), 2);
    assert_eq!(store.storage().keys()?, vec![STORAGE_KEY.to_string()]);
    Ok(())
}

#[test]
fn test_reset_is_persisted() {
    let (mut store, storage) = test_store();
    StandardBanks::with_activity(&mut store);
    store.reset_to_default();

    let reopened = LedgerStore::open(storage);
    assert!(reopened.list_txns().is_empty());
    assert_eq!(reopened.list_banks().len(), 12);
}

#[test]
fn test_import_is_persisted() -> Result<()> {
    let (mut store, storage) = test_store();
    let mut source = empty_store();
    StandardBanks::with_activity(&mut source);

    assert!(store.import_json(&source.export_json()?)?);

    let reopened = LedgerStore::open(storage);
    assert_eq!(reopened.list_txns(), source.list_txns());
    assert!(reopened.state().meta.imported_at.is_some());
    Ok(())
}
