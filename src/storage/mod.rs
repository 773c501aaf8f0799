pub mod json_backend;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::{
    errors::LedgerError,
    ledger::{LedgerSnapshot, Transaction, TransactionId},
};

pub type Result<T> = std::result::Result<T, LedgerError>;

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Logical layout of everything a store keeps for one ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default = "PersistedState::schema_version_default")]
    pub schema_version: u8,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default = "PersistedState::next_id_default")]
    pub next_id: TransactionId,
}

impl PersistedState {
    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    fn next_id_default() -> TransactionId {
        TransactionId(1)
    }

    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            transactions: snapshot.transactions.clone(),
            balance: snapshot.balance,
            next_id: snapshot.next_id,
        }
    }

    pub fn into_snapshot(self) -> LedgerSnapshot {
        LedgerSnapshot {
            transactions: self.transactions,
            balance: self.balance,
            next_id: self.next_id,
        }
    }
}

/// Abstraction over persistence backends capable of storing one ledger document.
pub trait LedgerStore: Send {
    /// Returns `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<PersistedState>>;
    fn save(&mut self, state: &PersistedState) -> Result<()>;
    fn clear(&mut self) -> Result<()>;

    /// Short human-readable description used in logs.
    fn describe(&self) -> String;
}

pub(crate) fn ensure_schema_support(schema_version: u8) -> Result<()> {
    if schema_version > CURRENT_SCHEMA_VERSION {
        return Err(LedgerError::Persistence(format!(
            "ledger schema v{} is newer than supported v{}",
            schema_version, CURRENT_SCHEMA_VERSION
        )));
    }
    Ok(())
}

pub use json_backend::{BackupInfo, JsonFileStore};
pub use memory::MemoryStore;
