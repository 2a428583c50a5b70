//! Normalization of loosely shaped JSON into ledger records.
//!
//! Both the persisted blob and user imports go through these rules, so an
//! older or hand-edited document never fails to load: every missing or
//! mistyped field falls back to its default.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::{
    Bank, LedgerState, StateMeta, Transaction, TxnKind, UNNAMED_BANK, coerce_amount_value,
    dates, new_id,
};

/// True for inputs that count as "nothing was given": `null`, `false`,
/// zero and the empty string.
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Accept the persisted blob only if it is an object with array-typed
/// `banks` and `txns`.
pub fn state_from_stored(value: &Value) -> Option<LedgerState> {
    let banks = value.get("banks").filter(|v| v.is_array())?;
    let txns = value.get("txns").filter(|v| v.is_array())?;
    let mut state = LedgerState {
        banks: normalize_banks(Some(banks)),
        txns: normalize_txns(Some(txns)),
        meta: normalize_meta(value.get("meta")),
    };
    dedupe_ids(&mut state);
    Some(state)
}

/// Build a replacement state from an import document.
///
/// A missing `banks` array yields the seed banks; a missing `txns` array
/// yields no transactions. Returns `None` if the input is absent.
pub fn state_from_import(value: &Value, imported_at: DateTime<Utc>) -> Option<LedgerState> {
    if is_absent(value) {
        return None;
    }
    let mut meta = normalize_meta(value.get("meta"));
    meta.imported_at = Some(imported_at);

    let mut state = LedgerState {
        banks: normalize_banks(value.get("banks")),
        txns: normalize_txns(value.get("txns")),
        meta,
    };
    dedupe_ids(&mut state);
    Some(state)
}

/// Banks from an array, or the seed list when there is no array.
pub fn normalize_banks(raw: Option<&Value>) -> Vec<Bank> {
    match raw.and_then(Value::as_array) {
        Some(items) => items.iter().map(normalize_bank).collect(),
        None => Bank::seed(),
    }
}

/// Transactions from an array, or none when there is no array.
pub fn normalize_txns(raw: Option<&Value>) -> Vec<Transaction> {
    match raw.and_then(Value::as_array) {
        Some(items) => items.iter().map(normalize_txn).collect(),
        None => Vec::new(),
    }
}

pub fn normalize_bank(raw: &Value) -> Bank {
    Bank {
        id: id_field(raw.get("id")).unwrap_or_else(new_id),
        name: non_empty_string(raw.get("name")).unwrap_or_else(|| UNNAMED_BANK.to_string()),
        opening: raw.get("opening").map(coerce_amount_value).unwrap_or(0.0),
    }
}

pub fn normalize_txn(raw: &Value) -> Transaction {
    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .map(TxnKind::coerce)
        .unwrap_or_default();

    Transaction {
        id: id_field(raw.get("id")).unwrap_or_else(new_id),
        date: date_field(raw.get("date")).unwrap_or_else(dates::now),
        kind,
        amount: raw.get("amount").map(coerce_amount_value).unwrap_or(0.0),
        category: string_field(raw.get("category")),
        notes: string_field(raw.get("notes")),
        bank_id: id_field(raw.get("bankId")),
        from_bank: id_field(raw.get("fromBank")),
        to_bank: id_field(raw.get("toBank")),
        meta: object_field(raw.get("meta")),
    }
}

pub fn normalize_meta(raw: Option<&Value>) -> StateMeta {
    let mut extra = object_field(raw);
    let created_at = extra.remove("createdAt").as_ref().and_then(|v| date_field(Some(v)));
    let imported_at = extra.remove("importedAt").as_ref().and_then(|v| date_field(Some(v)));
    StateMeta {
        created_at,
        imported_at,
        extra,
    }
}

/// Give any repeated bank or transaction id a fresh one.
fn dedupe_ids(state: &mut LedgerState) {
    let mut seen = HashSet::new();
    for bank in &mut state.banks {
        if !seen.insert(bank.id.clone()) {
            tracing::warn!(id = %bank.id, "duplicate bank id, assigning a new one");
            bank.id = new_id();
            seen.insert(bank.id.clone());
        }
    }

    let mut seen = HashSet::new();
    for txn in &mut state.txns {
        if !seen.insert(txn.id.clone()) {
            tracing::warn!(id = %txn.id, "duplicate transaction id, assigning a new one");
            txn.id = new_id();
            seen.insert(txn.id.clone());
        }
    }
}

/// Identifiers may arrive as strings or numbers; empty means missing.
fn id_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_default()
}

fn object_field(value: Option<&Value>) -> Map<String, Value> {
    value
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Dates may be any string the date parser accepts, or epoch milliseconds.
fn date_field(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => dates::try_parse_date(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}
