use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

use super::transaction::{Transaction, TransactionId, TransactionInput};

/// Tolerance used when comparing folded balances against stored ones.
pub const BALANCE_EPSILON: f64 = 1e-6;

/// Immutable view of the ledger at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub transactions: Vec<Transaction>,
    pub balance: f64,
    pub next_id: TransactionId,
}

impl LedgerSnapshot {
    pub fn empty() -> Self {
        Self {
            transactions: Vec::new(),
            balance: 0.0,
            next_id: TransactionId(1),
        }
    }

    /// Builds a snapshot whose balance is the fold of `transactions`.
    ///
    /// When the highest id is `u64::MAX` the counter stays there and further adds are refused.
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let next_id = transactions
            .iter()
            .map(|txn| txn.id)
            .max()
            .map(|max| max.checked_next().unwrap_or(max))
            .unwrap_or(TransactionId(1));
        let balance = fold_balance(&transactions);
        Self {
            transactions,
            balance,
            next_id,
        }
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id == id)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Balance recomputed from scratch.
    pub fn folded_balance(&self) -> f64 {
        fold_balance(&self.transactions)
    }

    pub fn balance_drift(&self) -> f64 {
        self.balance - self.folded_balance()
    }

    pub fn is_consistent(&self) -> bool {
        self.balance_drift().abs() <= BALANCE_EPSILON
    }

    pub(crate) fn with_added(
        &self,
        input: TransactionInput,
    ) -> Result<(Self, TransactionId), LedgerError> {
        let id = self.next_id;
        let next_id = id
            .checked_next()
            .ok_or(LedgerError::IdentifiersExhausted)?;
        let txn = Transaction::from_input(id, input);
        let mut transactions = self.transactions.clone();
        let balance = self.balance + txn.amount;
        transactions.push(txn);
        let next = Self {
            transactions,
            balance,
            next_id,
        };
        Ok((next, id))
    }

    pub(crate) fn with_replaced(
        &self,
        id: TransactionId,
        input: TransactionInput,
    ) -> Option<(Self, Transaction)> {
        let position = self.transactions.iter().position(|txn| txn.id == id)?;
        let mut transactions = self.transactions.clone();
        let replacement = Transaction::from_input(id, input);
        let previous = std::mem::replace(&mut transactions[position], replacement);
        let balance = self.balance - previous.amount + transactions[position].amount;
        Some((
            Self {
                transactions,
                balance,
                next_id: self.next_id,
            },
            previous,
        ))
    }

    pub(crate) fn with_removed(&self, id: TransactionId) -> Option<(Self, Transaction)> {
        let position = self.transactions.iter().position(|txn| txn.id == id)?;
        let mut transactions = self.transactions.clone();
        let removed = transactions.remove(position);
        let balance = self.balance - removed.amount;
        Some((
            Self {
                transactions,
                balance,
                next_id: self.next_id,
            },
            removed,
        ))
    }
}

impl Default for LedgerSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

pub fn fold_balance(transactions: &[Transaction]) -> f64 {
    transactions.iter().map(|txn| txn.amount).sum()
}
