use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, coerce_amount};

pub type BankId = String;

pub const UNNAMED_BANK: &str = "Unnamed";

/// Banks every fresh ledger starts with, in display order.
pub const SEED_BANKS: [&str; 12] = [
    "State Bank of India",
    "HDFC Bank",
    "ICICI Bank",
    "Axis Bank",
    "Kotak Mahindra Bank",
    "Punjab National Bank",
    "Bank of Baroda",
    "Canara Bank",
    "Union Bank of India",
    "IDFC First Bank",
    "Yes Bank",
    "Cash",
];

/// Generate a fresh opaque identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A named account that groups transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    pub id: BankId,
    pub name: String,
    pub opening: Amount,
}

impl Bank {
    /// Create a bank with a fresh id. Blank names become "Unnamed".
    pub fn new(name: &str, opening: Amount) -> Self {
        Self {
            id: new_id(),
            name: display_name(name).unwrap_or(UNNAMED_BANK).to_string(),
            opening: coerce_amount(opening),
        }
    }

    /// The fixed seed list, each with a new id and zero opening balance.
    pub fn seed() -> Vec<Bank> {
        SEED_BANKS.iter().map(|name| Bank::new(name, 0.0)).collect()
    }

    /// Rename in place. A blank name keeps the current one.
    pub fn rename(&mut self, name: &str) {
        if let Some(name) = display_name(name) {
            self.name = name.to_string();
        }
    }
}

fn display_name(name: &str) -> Option<&str> {
    if name.is_empty() { None } else { Some(name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_defaults_to_unnamed() {
        let bank = Bank::new("", 10.0);
        assert_eq!(bank.name, "Unnamed");
        assert_eq!(bank.opening, 10.0);
    }

    #[test]
    fn test_non_finite_opening_is_zero() {
        assert_eq!(Bank::new("Cash", f64::NAN).opening, 0.0);
    }

    #[test]
    fn test_seed_banks_have_unique_ids() {
        let banks = Bank::seed();
        assert_eq!(banks.len(), 12);
        let mut ids: Vec<_> = banks.iter().map(|b| b.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 12);
        assert!(banks.iter().all(|b| b.opening == 0.0));
    }

    #[test]
    fn test_rename_keeps_old_name_when_blank() {
        let mut bank = Bank::new("Old", 0.0);
        bank.rename("");
        assert_eq!(bank.name, "Old");
        bank.rename("New");
        assert_eq!(bank.name, "New");
    }
}
