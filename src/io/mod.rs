pub mod export;
pub mod import;

pub use export::{Exporter, LedgerSnapshot};
pub use import::{normalize_bank, normalize_txn, state_from_import, state_from_stored};
