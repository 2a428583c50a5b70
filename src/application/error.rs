use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Bank not found: {0}")]
    BankNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Nothing to import")]
    EmptyImport,

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
