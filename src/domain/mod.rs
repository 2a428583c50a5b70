mod bank;
pub mod dates;
mod ledger;
mod money;
mod transaction;

pub use bank::*;
pub use dates::{display_date, fmt_date, parse_date, to_iso};
pub use ledger::*;
pub use money::*;
pub use transaction::*;
