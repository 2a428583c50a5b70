// Application layer: the ledger store and its error types.

pub mod error;
mod store;

pub use error::*;
pub use store::*;
