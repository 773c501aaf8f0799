use thiserror::Error;

use crate::ledger::TransactionId;

/// Error type that captures ledger, storage, and configuration failures.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Invalid transaction: {0}")]
    Validation(String),
    #[error("Transaction {0} not found")]
    NotFound(TransactionId),
    #[error("Transaction identifiers exhausted")]
    IdentifiersExhausted,
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub fn is_persistence(&self) -> bool {
        matches!(self, LedgerError::Persistence(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}
