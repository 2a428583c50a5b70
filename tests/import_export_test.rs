mod common;

use anyhow::Result;
use common::{StandardBanks, empty_store, test_store};
use khata::application::LedgerError;
use khata::domain::{TxnDraft, TxnKind};
use khata::io::Exporter;
use serde_json::{Value, json};

#[test]
fn test_import_coerces_loose_transactions() {
    let (mut store, _) = test_store();

    assert!(store.import_from(&json!({
        "banks": [],
        "txns": [{"type": "bogus", "amount": "12.5"}]
    })));

    let txns = store.list_txns();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].kind, TxnKind::Income);
    assert_eq!(txns[0].amount, 12.5);
    assert!(store.list_banks().is_empty());
    assert!(store.state().meta.imported_at.is_some());
}

#[test]
fn test_import_rejects_absent_input() {
    let mut store = empty_store();
    StandardBanks::with_activity(&mut store);
    let before = store.state();

    assert!(!store.import_from(&Value::Null));
    assert!(!store.import_from(&json!(false)));
    assert!(!store.import_from(&json!(0)));
    assert!(!store.import_from(&json!("")));
    assert_eq!(store.state(), before);
}

#[test]
fn test_import_without_arrays_falls_back() {
    let mut store = empty_store();
    StandardBanks::with_activity(&mut store);

    assert!(store.import_from(&json!({"banks": "nope"})));
    assert_eq!(store.list_banks().len(), 12);
    assert!(store.list_txns().is_empty());
}

#[test]
fn test_import_fills_bank_defaults() {
    let mut store = empty_store();
    store.import_from(&json!({
        "banks": [{"name": "Locker", "opening": "1500"}, {"id": "b2"}],
        "txns": []
    }));

    let banks = store.list_banks();
    assert_eq!(banks.len(), 2);
    assert_eq!(banks[0].name, "Locker");
    assert_eq!(banks[0].opening, 1500.0);
    assert!(!banks[0].id.is_empty());
    assert_eq!(banks[1].id, "b2");
    assert_eq!(banks[1].name, "Unnamed");
    assert_eq!(banks[1].opening, 0.0);
}

#[test]
fn test_export_import_round_trip() -> Result<()> {
    let mut store = empty_store();
    StandardBanks::with_activity(&mut store);
    store.add_txn(
        TxnDraft::new("expense", 19.99)
            .with_notes("coffee")
            .with_meta("source", json!("receipt")),
    );

    let text = store.export_json()?;
    let parsed: Value = serde_json::from_str(&text)?;
    assert!(parsed.get("exportedAt").and_then(Value::as_str).is_some());
    assert!(parsed["banks"].is_array());
    assert!(parsed["txns"].is_array());

    let (mut other, _) = test_store();
    assert!(other.import_from(&parsed));

    assert_eq!(other.list_banks(), store.list_banks());
    assert_eq!(other.list_txns(), store.list_txns());
    assert!(other.state().meta.imported_at.is_some());
    assert_eq!(other.state().meta.created_at, store.state().meta.created_at);
    Ok(())
}

#[test]
fn test_round_trip_keeps_sub_millisecond_dates_stable() -> Result<()> {
    let mut store = empty_store();
    let txn = store.add_txn(TxnDraft::new("income", 1.0).with_date("2024-03-15T10:30:00.123456Z"));
    assert_eq!(txn.date.timestamp_subsec_nanos(), 123_000_000);
    let before = store.list_txns();

    let text = store.export_json()?;
    assert!(store.import_json(&text)?);
    assert_eq!(store.list_txns(), before);
    Ok(())
}

#[test]
fn test_export_is_pretty_and_pure() -> Result<()> {
    let mut store = empty_store();
    StandardBanks::with_activity(&mut store);
    let before = store.state();

    let text = store.export_json()?;
    assert!(text.contains('\n'));
    assert!(text.contains("  \"banks\""));
    assert_eq!(store.state(), before);
    Ok(())
}

#[test]
fn test_import_json_text() -> Result<()> {
    let mut store = empty_store();

    assert!(store.import_json(r#"{"txns": [{"type": "expense", "amount": 3}]}"#)?);
    assert_eq!(store.list_txns()[0].kind, TxnKind::Expense);
    assert_eq!(store.list_banks().len(), 12);

    assert!(!store.import_json("null")?);
    assert!(matches!(
        store.import_json("{not json"),
        Err(LedgerError::Json(_))
    ));
    Ok(())
}

#[test]
fn test_export_txns_csv() -> Result<()> {
    let mut store = empty_store();
    StandardBanks::with_activity(&mut store);

    let mut buf = Vec::new();
    let count = Exporter::new(&store).export_txns_csv(&mut buf)?;
    assert_eq!(count, 3);

    let text = String::from_utf8(buf)?;
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "id,date,type,amount,category,notes,bank,from_bank,to_bank"
    );
    assert!(lines[1].contains(",01-01-2024,income,5000,salary,,Savings,,"));
    assert!(lines[3].ends_with(",Savings,Current"));
    Ok(())
}

#[test]
fn test_export_balances_csv() -> Result<()> {
    let mut store = empty_store();
    StandardBanks::with_activity(&mut store);

    let mut buf = Vec::new();
    let count = Exporter::new(&store).export_balances_csv(&mut buf)?;
    assert_eq!(count, 2);

    let text = String::from_utf8(buf)?;
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "bank,opening,income,expense,balance,count");
    assert_eq!(lines[1], "Savings,1000,5000,0,6000,2");
    assert_eq!(lines[2], "Current,0,0,1200,-1200,2");
    Ok(())
}

#[test]
fn test_export_full_json_writer() -> Result<()> {
    let mut store = empty_store();
    StandardBanks::with_activity(&mut store);

    let mut buf = Vec::new();
    let snapshot = Exporter::new(&store).export_full_json(&mut buf)?;
    assert_eq!(snapshot.state.txns.len(), 3);

    let parsed: Value = serde_json::from_slice(&buf)?;
    assert_eq!(parsed["txns"].as_array().map(Vec::len), Some(3));
    Ok(())
}
