use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerStore;
use crate::domain::LedgerState;
use crate::domain::dates::{self, display_date, iso_format};
use crate::storage::KeyValueStore;

/// Full ledger snapshot: the state plus the moment it was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    #[serde(flatten)]
    pub state: LedgerState,
    #[serde(with = "iso_format")]
    pub exported_at: DateTime<Utc>,
}

impl LedgerSnapshot {
    pub fn capture(state: LedgerState) -> Self {
        Self {
            state,
            exported_at: dates::now(),
        }
    }

    /// Pretty-printed JSON text.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a, S: KeyValueStore> {
    store: &'a LedgerStore<S>,
}

impl<'a, S: KeyValueStore> Exporter<'a, S> {
    pub fn new(store: &'a LedgerStore<S>) -> Self {
        Self { store }
    }

    /// Export transactions to CSV format, with bank names resolved
    pub fn export_txns_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let state = self.store.state();
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record([
            "id", "date", "type", "amount", "category", "notes", "bank", "from_bank", "to_bank",
        ])?;

        let bank_name = |id: &Option<String>| {
            id.as_deref()
                .and_then(|id| state.bank(id))
                .map(|b| b.name.clone())
                .unwrap_or_default()
        };

        let mut count = 0;
        for txn in &state.txns {
            csv_writer.write_record([
                txn.id.clone(),
                display_date(&txn.date),
                txn.kind.as_str().to_string(),
                txn.amount.to_string(),
                txn.category.clone(),
                txn.notes.clone(),
                bank_name(&txn.bank_id),
                bank_name(&txn.from_bank),
                bank_name(&txn.to_bank),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export per-bank balances to CSV format
    pub fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let balances = self.store.balances_per_bank();
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(["bank", "opening", "income", "expense", "balance", "count"])?;

        for b in &balances {
            csv_writer.write_record([
                b.name.clone(),
                b.opening.to_string(),
                b.income.to_string(),
                b.expense.to_string(),
                b.balance.to_string(),
                b.count.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(balances.len())
    }

    /// Export the full ledger as a pretty JSON snapshot
    pub fn export_full_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let snapshot = LedgerSnapshot::capture(self.store.state());
        let json = snapshot.to_json_pretty()?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(snapshot)
    }
}
