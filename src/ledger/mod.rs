//! Transaction ledger: records, snapshots, and the shared ledger handle.

#[allow(clippy::module_inception)]
pub mod ledger;
pub mod seed;
pub mod snapshot;
pub mod subscription;
pub mod transaction;
mod writer;

pub use ledger::{BalancePolicy, InitReport, Ledger, LedgerOptions, LoadOrigin};
pub use seed::{seed_snapshot, seed_transactions};
pub use snapshot::{fold_balance, LedgerSnapshot, BALANCE_EPSILON};
pub use subscription::Subscription;
pub use transaction::{
    Transaction, TransactionId, TransactionInput, TransactionKind, DEFAULT_CATEGORIES,
};
pub use writer::{Commit, PersistTicket};
