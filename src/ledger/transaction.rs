//! Transaction records and the caller-facing input payload.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

/// Categories offered by entry forms. The ledger accepts any label.
pub const DEFAULT_CATEGORIES: [&str; 8] = [
    "Food",
    "Transport",
    "Housing",
    "Leisure",
    "Health",
    "Education",
    "Work",
    "Other",
];

/// Ledger-assigned transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// The following identifier, or `None` once the counter is exhausted.
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for TransactionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Sign applied to a magnitude of this kind.
    pub fn direction(self) -> f64 {
        match self {
            TransactionKind::Income => 1.0,
            TransactionKind::Expense => -1.0,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "income" | "in" | "receita" => Some(TransactionKind::Income),
            "expense" | "out" | "despesa" => Some(TransactionKind::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: f64,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub date: String,
}

impl Transaction {
    pub fn magnitude(&self) -> f64 {
        self.amount.abs()
    }

    pub(crate) fn from_input(id: TransactionId, input: TransactionInput) -> Self {
        Self {
            id,
            amount: input.amount,
            description: input.description,
            kind: input.kind,
            category: input.category,
            date: input.date,
        }
    }
}

/// Payload for creating or replacing a transaction. Identifiers are never caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub amount: f64,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub date: String,
}

impl TransactionInput {
    /// Builds an input from an unsigned magnitude, applying the sign convention of `kind`.
    pub fn from_magnitude(
        kind: TransactionKind,
        magnitude: f64,
        description: impl Into<String>,
        category: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            amount: kind.direction() * magnitude,
            description: description.into(),
            kind,
            category: category.into(),
            date: date.into(),
        }
    }

    pub fn income(
        magnitude: f64,
        description: impl Into<String>,
        category: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self::from_magnitude(TransactionKind::Income, magnitude, description, category, date)
    }

    pub fn expense(
        magnitude: f64,
        description: impl Into<String>,
        category: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self::from_magnitude(TransactionKind::Expense, magnitude, description, category, date)
    }

    /// Checks the invariants the ledger enforces on every stored record.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.description.trim().is_empty() {
            return Err(LedgerError::Validation("description must not be empty".into()));
        }
        if !self.amount.is_finite() {
            return Err(LedgerError::Validation("amount must be a finite number".into()));
        }
        if self.amount == 0.0 {
            return Err(LedgerError::Validation("amount must not be zero".into()));
        }
        let is_income = self.kind == TransactionKind::Income;
        if (self.amount > 0.0) != is_income {
            return Err(LedgerError::Validation(format!(
                "amount {} does not match {} sign convention",
                self.amount,
                self.kind.to_string().to_lowercase()
            )));
        }
        Ok(())
    }
}

impl From<&Transaction> for TransactionInput {
    fn from(txn: &Transaction) -> Self {
        Self {
            amount: txn.amount,
            description: txn.description.clone(),
            kind: txn.kind,
            category: txn.category.clone(),
            date: txn.date.clone(),
        }
    }
}
