//! Example data installed the first time a ledger starts without persisted state.

use crate::errors::LedgerError;

use super::{
    snapshot::LedgerSnapshot,
    transaction::{Transaction, TransactionId, TransactionKind},
};

pub fn seed_transactions() -> Vec<Transaction> {
    vec![
        seed(1, -85.0, "Supermercado", TransactionKind::Expense, "Food", "Hoje 14:30"),
        seed(2, 500.0, "Freelance", TransactionKind::Income, "Work", "Ontem 09:15"),
        seed(3, -120.0, "Posto Shell", TransactionKind::Expense, "Transport", "15/05 18:40"),
    ]
}

pub fn seed_snapshot() -> LedgerSnapshot {
    LedgerSnapshot::from_transactions(seed_transactions())
}

/// Seed data numbered from `start`, for stores whose earlier ids must not be handed out again.
///
/// Fails when the counter has no room left for the seed records and the id after them.
pub fn seed_snapshot_from(start: TransactionId) -> Result<LedgerSnapshot, LedgerError> {
    let seeds = seed_transactions();
    start
        .0
        .checked_add(seeds.len() as u64)
        .ok_or(LedgerError::IdentifiersExhausted)?;
    let transactions = seeds
        .into_iter()
        .zip(start.0..)
        .map(|(txn, id)| Transaction {
            id: TransactionId(id),
            ..txn
        })
        .collect();
    Ok(LedgerSnapshot::from_transactions(transactions))
}

fn seed(
    id: u64,
    amount: f64,
    description: &str,
    kind: TransactionKind,
    category: &str,
    date: &str,
) -> Transaction {
    Transaction {
        id: TransactionId(id),
        amount,
        description: description.into(),
        kind,
        category: category.into(),
        date: date.into(),
    }
}
