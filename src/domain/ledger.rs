use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::dates::{self, iso_format};
use super::{Amount, Bank, Transaction, TxnKind};

/// Provenance timestamps for the whole ledger. Unknown keys are carried through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMeta {
    #[serde(
        default,
        with = "iso_format::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "iso_format::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub imported_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The root aggregate: every bank, every transaction, and provenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub banks: Vec<Bank>,
    pub txns: Vec<Transaction>,
    #[serde(default)]
    pub meta: StateMeta,
}

impl LedgerState {
    /// A first-run ledger: the seed banks and no transactions.
    pub fn fresh() -> Self {
        Self {
            banks: Bank::seed(),
            txns: Vec::new(),
            meta: StateMeta {
                created_at: Some(dates::now()),
                ..Default::default()
            },
        }
    }

    pub fn bank(&self, id: &str) -> Option<&Bank> {
        self.banks.iter().find(|b| b.id == id)
    }

    pub fn bank_mut(&mut self, id: &str) -> Option<&mut Bank> {
        self.banks.iter_mut().find(|b| b.id == id)
    }

    pub fn txn(&self, id: &str) -> Option<&Transaction> {
        self.txns.iter().find(|t| t.id == id)
    }

    pub fn txn_mut(&mut self, id: &str) -> Option<&mut Transaction> {
        self.txns.iter_mut().find(|t| t.id == id)
    }
}

/// Aggregate income and expense. Transfers count toward neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub income: Amount,
    pub expense: Amount,
    pub net: Amount,
}

/// Derived balance for one bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankBalance {
    pub id: String,
    pub name: String,
    pub opening: Amount,
    pub income: Amount,
    pub expense: Amount,
    pub balance: Amount,
    /// Directly tied transactions plus transfers naming this bank
    pub count: usize,
}

/// Sum income minus expense across all transactions.
pub fn compute_totals(txns: &[Transaction]) -> Totals {
    let (income, expense) = txns.iter().fold((0.0, 0.0), |(inc, exp), t| match t.kind {
        TxnKind::Income => (inc + t.amount, exp),
        TxnKind::Expense => (inc, exp + t.amount),
        TxnKind::Transfer => (inc, exp),
    });
    Totals {
        income,
        expense,
        net: income - expense,
    }
}

/// Compute the balance of a single bank.
///
/// Income and expense only include transactions whose `bank_id` matches;
/// transfers never move the balance. The count also includes transfers that
/// name the bank as either endpoint.
pub fn compute_bank_balance(bank: &Bank, txns: &[Transaction]) -> BankBalance {
    let mut income = 0.0;
    let mut expense = 0.0;
    let mut count = 0;

    for txn in txns {
        let direct = txn.bank_id.as_deref() == Some(bank.id.as_str());
        if direct {
            match txn.kind {
                TxnKind::Income => income += txn.amount,
                TxnKind::Expense => expense += txn.amount,
                TxnKind::Transfer => {}
            }
        }
        if direct || txn.touches_bank(&bank.id) {
            count += 1;
        }
    }

    BankBalance {
        id: bank.id.clone(),
        name: bank.name.clone(),
        opening: bank.opening,
        income,
        expense,
        balance: bank.opening + income - expense,
        count,
    }
}

/// Balances for all banks, in bank order.
pub fn compute_all_balances(banks: &[Bank], txns: &[Transaction]) -> Vec<BankBalance> {
    banks
        .iter()
        .map(|bank| compute_bank_balance(bank, txns))
        .collect()
}
