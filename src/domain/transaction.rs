use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::dates::{self, iso_format};
use super::{Amount, BankId, coerce_amount, new_id};

pub type TxnId = String;

pub const TRANSFER_CATEGORY: &str = "Transfer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnKind {
    /// Money coming into a bank
    #[default]
    Income,
    /// Money leaving a bank
    Expense,
    /// Movement between two banks, neutral for totals
    Transfer,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnKind::Income => "income",
            TxnKind::Expense => "expense",
            TxnKind::Transfer => "transfer",
        }
    }

    /// Exact match on the three kinds; anything else is income.
    pub fn coerce(s: &str) -> Self {
        match s {
            "expense" => TxnKind::Expense,
            "transfer" => TxnKind::Transfer,
            _ => TxnKind::Income,
        }
    }
}

impl std::fmt::Display for TxnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A dated income, expense or transfer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TxnId,
    #[serde(with = "iso_format")]
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TxnKind,
    pub amount: Amount,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub notes: String,
    /// Weak reference to the owning bank; may dangle after removal
    #[serde(default)]
    pub bank_id: Option<BankId>,
    /// Source bank, transfers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_bank: Option<BankId>,
    /// Destination bank, transfers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_bank: Option<BankId>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl Transaction {
    /// Build a normalized record from a draft. Always assigns a fresh id.
    pub fn from_draft(draft: TxnDraft) -> Self {
        let kind = draft
            .kind
            .as_deref()
            .map(TxnKind::coerce)
            .unwrap_or_default();
        let (bank_id, from_bank, to_bank) = match kind {
            TxnKind::Transfer => (None, draft.from_bank, draft.to_bank),
            _ => (draft.bank_id, None, None),
        };

        Self {
            id: new_id(),
            date: draft
                .date
                .as_deref()
                .map(|d| dates::parse_date(d))
                .unwrap_or_else(dates::now),
            kind,
            amount: coerce_amount(draft.amount.unwrap_or(0.0)),
            category: draft.category.unwrap_or_default(),
            notes: draft.notes.unwrap_or_default(),
            bank_id,
            from_bank,
            to_bank,
            meta: draft.meta,
        }
    }

    /// Create a transfer between two (possibly unassigned) banks.
    /// Returns `None` unless the amount is finite and positive.
    pub fn transfer(
        from_bank: Option<BankId>,
        to_bank: Option<BankId>,
        amount: Amount,
        date: Option<&str>,
        notes: &str,
    ) -> Option<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return None;
        }
        Some(Self {
            id: new_id(),
            date: date.map(|d| dates::parse_date(d)).unwrap_or_else(dates::now),
            kind: TxnKind::Transfer,
            amount,
            category: TRANSFER_CATEGORY.to_string(),
            notes: notes.to_string(),
            bank_id: None,
            from_bank,
            to_bank,
            meta: Map::new(),
        })
    }

    /// Shallow merge: every field set on the patch replaces the current value.
    /// Dates and amounts are normalized the same way as in [`from_draft`](Self::from_draft).
    pub fn apply(&mut self, patch: TxnPatch) {
        if let Some(date) = patch.date {
            self.date = dates::parse_date(date);
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(amount) = patch.amount {
            self.amount = coerce_amount(amount);
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(bank_id) = patch.bank_id {
            self.bank_id = bank_id;
        }
        if let Some(from_bank) = patch.from_bank {
            self.from_bank = from_bank;
        }
        if let Some(to_bank) = patch.to_bank {
            self.to_bank = to_bank;
        }
        if let Some(meta) = patch.meta {
            self.meta = meta;
        }
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == TxnKind::Transfer
    }

    /// True if this transfer names the bank on either side.
    pub fn touches_bank(&self, bank_id: &str) -> bool {
        self.is_transfer()
            && (self.from_bank.as_deref() == Some(bank_id)
                || self.to_bank.as_deref() == Some(bank_id))
    }
}

/// Loose input for a new transaction; unset fields get defaults.
#[derive(Debug, Clone, Default)]
pub struct TxnDraft {
    pub date: Option<String>,
    pub kind: Option<String>,
    pub amount: Option<Amount>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub bank_id: Option<BankId>,
    pub from_bank: Option<BankId>,
    pub to_bank: Option<BankId>,
    pub meta: Map<String, Value>,
}

impl TxnDraft {
    pub fn new(kind: impl Into<String>, amount: Amount) -> Self {
        Self {
            kind: Some(kind.into()),
            amount: Some(amount),
            ..Default::default()
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_bank(mut self, bank_id: impl Into<BankId>) -> Self {
        self.bank_id = Some(bank_id.into());
        self
    }

    pub fn with_banks(mut self, from: Option<BankId>, to: Option<BankId>) -> Self {
        self.from_bank = from;
        self.to_bank = to;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

/// Partial update. The outer `Option` on bank references means "leave as is";
/// `Some(None)` clears the reference.
#[derive(Debug, Clone, Default)]
pub struct TxnPatch {
    pub date: Option<DateTime<Utc>>,
    pub kind: Option<TxnKind>,
    pub amount: Option<Amount>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub bank_id: Option<Option<BankId>>,
    pub from_bank: Option<Option<BankId>>,
    pub to_bank: Option<Option<BankId>>,
    pub meta: Option<Map<String, Value>>,
}

impl TxnPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.kind.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.notes.is_none()
            && self.bank_id.is_none()
            && self.from_bank.is_none()
            && self.to_bank.is_none()
            && self.meta.is_none()
    }
}
