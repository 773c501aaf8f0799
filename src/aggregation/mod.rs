//! Read-only projections over ledger snapshots.

use std::collections::HashMap;

use serde::Serialize;

use crate::ledger::{LedgerSnapshot, Transaction, TransactionKind};

/// Number of expense categories shown by the statistics view.
pub const TOP_CATEGORY_LIMIT: usize = 5;
/// Category label that matches every category in a query.
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// Criteria for [`filter`]; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    pub text: String,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
}

impl TransactionQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        self.matches_text(txn) && self.matches_kind(txn) && self.matches_category(txn)
    }

    fn matches_text(&self, txn: &Transaction) -> bool {
        let needle = self.text.trim().to_lowercase();
        needle.is_empty()
            || txn.description.to_lowercase().contains(&needle)
            || txn.category.to_lowercase().contains(&needle)
    }

    fn matches_kind(&self, txn: &Transaction) -> bool {
        self.kind.map_or(true, |kind| txn.kind == kind)
    }

    fn matches_category(&self, txn: &Transaction) -> bool {
        match self.category.as_deref() {
            None | Some(ALL_CATEGORIES) => true,
            Some(category) => txn.category == category,
        }
    }
}

/// Figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub balance: f64,
    pub income_total: f64,
    pub expense_total: f64,
    pub transaction_count: usize,
    pub income_count: usize,
    pub expense_count: usize,
    pub last_transaction: Option<Transaction>,
}

/// Sum of magnitudes of every transaction of `kind`.
pub fn total_by_kind(snapshot: &LedgerSnapshot, kind: TransactionKind) -> f64 {
    snapshot
        .transactions
        .iter()
        .filter(|txn| txn.kind == kind)
        .map(Transaction::magnitude)
        .sum()
}

pub fn count_by_kind(snapshot: &LedgerSnapshot, kind: TransactionKind) -> usize {
    snapshot
        .transactions
        .iter()
        .filter(|txn| txn.kind == kind)
        .count()
}

/// Expense magnitudes grouped by category, largest first.
pub fn totals_by_category(snapshot: &LedgerSnapshot, top: Option<usize>) -> Vec<CategoryTotal> {
    let mut grouped: HashMap<&str, f64> = HashMap::new();
    for txn in snapshot
        .transactions
        .iter()
        .filter(|txn| txn.kind == TransactionKind::Expense)
    {
        *grouped.entry(txn.category.as_str()).or_insert(0.0) += txn.magnitude();
    }

    let mut totals: Vec<CategoryTotal> = grouped
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total,
        })
        .collect();
    totals.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });
    if let Some(limit) = top {
        totals.truncate(limit);
    }
    totals
}

/// Matching transactions in insertion order.
pub fn filter(snapshot: &LedgerSnapshot, query: &TransactionQuery) -> Vec<Transaction> {
    snapshot
        .transactions
        .iter()
        .filter(|txn| query.matches(txn))
        .cloned()
        .collect()
}

/// At most `limit` transactions, highest id first.
pub fn recent(snapshot: &LedgerSnapshot, limit: usize) -> Vec<Transaction> {
    let mut ordered: Vec<&Transaction> = snapshot.transactions.iter().collect();
    ordered.sort_by(|a, b| b.id.cmp(&a.id));
    ordered.into_iter().take(limit).cloned().collect()
}

pub fn dashboard(snapshot: &LedgerSnapshot) -> DashboardStats {
    DashboardStats {
        balance: snapshot.balance,
        income_total: total_by_kind(snapshot, TransactionKind::Income),
        expense_total: total_by_kind(snapshot, TransactionKind::Expense),
        transaction_count: snapshot.len(),
        income_count: count_by_kind(snapshot, TransactionKind::Income),
        expense_count: count_by_kind(snapshot, TransactionKind::Expense),
        last_transaction: recent(snapshot, 1).into_iter().next(),
    }
}
