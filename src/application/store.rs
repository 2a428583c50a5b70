use serde_json::Value;

use crate::domain::{
    Bank, BankBalance, LedgerState, Totals, Transaction, TxnDraft, TxnPatch, compute_all_balances,
    compute_totals,
};
use crate::domain::dates;
use crate::io::{LedgerSnapshot, state_from_import, state_from_stored};
use crate::storage::KeyValueStore;

use super::LedgerError;

/// The single storage key holding the serialized ledger.
pub const STORAGE_KEY: &str = "khata.state";

/// Owns the ledger state and mirrors it to storage after every mutation.
///
/// Reads hand out owned copies. Writes are flushed before returning; a failed
/// write is logged and the in-memory state stays authoritative.
pub struct LedgerStore<S: KeyValueStore> {
    storage: S,
    state: LedgerState,
}

impl<S: KeyValueStore> LedgerStore<S> {
    /// Load the ledger from `storage`, falling back to a fresh default ledger
    /// when nothing usable is stored.
    pub fn open(storage: S) -> Self {
        match load_state(&storage) {
            Some(state) => Self { storage, state },
            None => {
                let store = Self {
                    storage,
                    state: LedgerState::fresh(),
                };
                store.persist();
                store
            }
        }
    }

    /// Borrow the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give back the storage backend.
    pub fn into_storage(self) -> S {
        self.storage
    }

    // ========================
    // Reads
    // ========================

    /// A copy of the full state.
    pub fn state(&self) -> LedgerState {
        self.state.clone()
    }

    /// Same as [`state`](Self::state); kept for callers that want the raw
    /// document rather than derived views.
    pub fn raw_state(&self) -> LedgerState {
        self.state()
    }

    pub fn list_banks(&self) -> Vec<Bank> {
        self.state.banks.clone()
    }

    pub fn list_txns(&self) -> Vec<Transaction> {
        self.state.txns.clone()
    }

    pub fn find_bank(&self, id: &str) -> Option<Bank> {
        self.state.bank(id).cloned()
    }

    pub fn find_txn(&self, id: &str) -> Option<Transaction> {
        self.state.txn(id).cloned()
    }

    /// Find a bank by exact name (first match in display order).
    pub fn find_bank_by_name(&self, name: &str) -> Option<Bank> {
        self.state.banks.iter().find(|b| b.name == name).cloned()
    }

    pub fn totals(&self) -> Totals {
        compute_totals(&self.state.txns)
    }

    pub fn balances_per_bank(&self) -> Vec<BankBalance> {
        compute_all_balances(&self.state.banks, &self.state.txns)
    }

    // ========================
    // Bank operations
    // ========================

    /// Append a new bank.
    pub fn add_bank(&mut self, name: &str, opening: f64) -> Bank {
        let bank = Bank::new(name, opening);
        self.state.banks.push(bank.clone());
        self.persist();
        bank
    }

    /// Rename a bank. Returns false if no bank has this id.
    pub fn rename_bank(&mut self, id: &str, name: &str) -> bool {
        let Some(bank) = self.state.bank_mut(id) else {
            return false;
        };
        bank.rename(name);
        self.persist();
        true
    }

    /// Remove a bank and unassign transactions tied to it through `bank_id`.
    /// Transfer endpoints naming the bank are left as they are.
    pub fn remove_bank(&mut self, id: &str) -> bool {
        let before = self.state.banks.len();
        self.state.banks.retain(|b| b.id != id);
        let removed = self.state.banks.len() != before;

        for txn in &mut self.state.txns {
            if txn.bank_id.as_deref() == Some(id) {
                txn.bank_id = None;
            }
        }

        self.persist();
        removed
    }

    // ========================
    // Transaction operations
    // ========================

    /// Normalize and append a transaction, returning the stored copy.
    pub fn add_txn(&mut self, draft: TxnDraft) -> Transaction {
        let txn = Transaction::from_draft(draft);
        self.state.txns.push(txn.clone());
        self.persist();
        txn
    }

    /// Merge a patch into an existing transaction.
    pub fn update_txn(&mut self, id: &str, patch: TxnPatch) -> bool {
        let Some(txn) = self.state.txn_mut(id) else {
            return false;
        };
        txn.apply(patch);
        self.persist();
        true
    }

    /// Delete a transaction. Returns false if it was not there.
    pub fn delete_txn(&mut self, id: &str) -> bool {
        let before = self.state.txns.len();
        self.state.txns.retain(|t| t.id != id);
        let removed = self.state.txns.len() != before;
        self.persist();
        removed
    }

    /// Record a transfer between two banks.
    ///
    /// Returns `None`, and leaves the ledger untouched, unless `amount` is
    /// a positive number.
    pub fn transfer(
        &mut self,
        from_bank: Option<&str>,
        to_bank: Option<&str>,
        amount: f64,
        date: Option<&str>,
        notes: &str,
    ) -> Option<Transaction> {
        let txn = Transaction::transfer(
            from_bank.map(String::from),
            to_bank.map(String::from),
            amount,
            date,
            notes,
        )?;
        self.state.txns.push(txn.clone());
        self.persist();
        Some(txn)
    }

    // ========================
    // Whole-ledger operations
    // ========================

    /// Throw everything away and start over with the seed banks.
    pub fn reset_to_default(&mut self) {
        self.state = LedgerState::fresh();
        self.persist();
    }

    /// Pretty JSON of the whole ledger plus an `exportedAt` stamp.
    pub fn export_json(&self) -> Result<String, LedgerError> {
        Ok(LedgerSnapshot::capture(self.state()).to_json_pretty()?)
    }

    /// Replace the ledger with an imported document.
    /// Returns false, changing nothing, when the input is absent.
    pub fn import_from(&mut self, value: &Value) -> bool {
        let Some(state) = state_from_import(value, dates::now()) else {
            return false;
        };
        tracing::info!(
            banks = state.banks.len(),
            txns = state.txns.len(),
            "importing ledger"
        );
        self.state = state;
        self.persist();
        true
    }

    /// Parse JSON text and import it.
    pub fn import_json(&mut self, text: &str) -> Result<bool, LedgerError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(self.import_from(&value))
    }

    fn persist(&self) {
        let blob = match serde_json::to_string(&self.state) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize ledger");
                return;
            }
        };
        match self.storage.set(STORAGE_KEY, &blob) {
            Ok(()) => tracing::debug!(bytes = blob.len(), "ledger persisted"),
            Err(e) => tracing::error!(error = %e, "failed to persist ledger, keeping in-memory state"),
        }
    }
}

/// Read and validate the stored blob. Any failure is logged and yields `None`.
fn load_state<S: KeyValueStore>(storage: &S) -> Option<LedgerState> {
    let blob = match storage.get(STORAGE_KEY) {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            tracing::debug!("no stored ledger, starting fresh");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read stored ledger, starting fresh");
            return None;
        }
    };

    let value: Value = match serde_json::from_str(&blob) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "stored ledger is not valid JSON, starting fresh");
            return None;
        }
    };

    let state = state_from_stored(&value);
    if state.is_none() {
        tracing::warn!("stored ledger has an unexpected shape, starting fresh");
    }
    state
}
