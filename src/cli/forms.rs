//! Entry-form parsing for transaction commands.
//!
//! The form is stricter than the ledger: amounts are entered as positive
//! magnitudes and descriptions need a few characters to be useful in lists.

use chrono::NaiveDate;

use crate::{
    currency::{parse_amount, LocaleConfig},
    ledger::{TransactionInput, TransactionKind},
};

pub const MIN_DESCRIPTION_CHARS: usize = 3;
pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown transaction type `{0}` (use income or expense)")]
    UnknownKind(String),
    #[error("invalid amount `{0}`")]
    InvalidAmount(String),
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("description must have at least 3 characters")]
    ShortDescription,
    #[error("category must not be empty")]
    EmptyCategory,
}

/// Raw field values as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionForm {
    pub kind: String,
    pub amount: String,
    pub description: String,
    pub category: String,
    pub date: Option<String>,
}

impl TransactionForm {
    /// Reads `<income|expense> <amount> <description> <category> [date]`.
    pub fn from_args(args: &[&str], usage: &'static str) -> Result<Self, FormError> {
        match args {
            [kind, amount, description, category] => Ok(Self::new(
                kind,
                amount,
                description,
                category,
                None,
            )),
            [kind, amount, description, category, date] => Ok(Self::new(
                kind,
                amount,
                description,
                category,
                Some(date),
            )),
            _ => Err(FormError::Usage(usage)),
        }
    }

    fn new(
        kind: &str,
        amount: &str,
        description: &str,
        category: &str,
        date: Option<&str>,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            amount: amount.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            date: date.map(str::to_string),
        }
    }

    /// Validates every field and applies the sign convention of the chosen kind.
    pub fn into_input(
        self,
        locale: &LocaleConfig,
        today: NaiveDate,
    ) -> Result<TransactionInput, FormError> {
        let kind = TransactionKind::from_label(&self.kind)
            .ok_or_else(|| FormError::UnknownKind(self.kind.clone()))?;

        let magnitude = parse_amount(&self.amount, locale)
            .ok_or_else(|| FormError::InvalidAmount(self.amount.clone()))?;
        if magnitude <= 0.0 {
            return Err(FormError::NonPositiveAmount);
        }

        let description = self.description.trim();
        if description.chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(FormError::ShortDescription);
        }

        let category = self.category.trim();
        if category.is_empty() {
            return Err(FormError::EmptyCategory);
        }

        let date = match self.date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => date.to_string(),
            _ => default_date(today),
        };

        Ok(TransactionInput::from_magnitude(
            kind,
            magnitude,
            description,
            category,
            date,
        ))
    }
}

pub fn default_date(today: NaiveDate) -> String {
    today.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const USAGE: &str = "add <income|expense> <amount> <description> <category> [date]";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn expense_form_becomes_negative_input_with_default_date() {
        let form = TransactionForm::from_args(&["expense", "85,00", "Supermercado", "Food"], USAGE)
            .unwrap();
        let input = form.into_input(&LocaleConfig::pt_br(), today()).unwrap();
        assert_eq!(input.amount, -85.0);
        assert_eq!(input.kind, TransactionKind::Expense);
        assert_eq!(input.date, "01/06/2025");
    }

    #[test]
    fn explicit_date_is_kept_verbatim() {
        let form = TransactionForm::from_args(
            &["income", "R$ 1.500,50", "Salário", "Work", "05/06/2025"],
            USAGE,
        )
        .unwrap();
        let input = form.into_input(&LocaleConfig::pt_br(), today()).unwrap();
        assert_eq!(input.amount, 1500.5);
        assert_eq!(input.date, "05/06/2025");
    }

    #[test]
    fn rejects_what_the_entry_form_rejects() {
        let locale = LocaleConfig::pt_br();
        let cases = [
            (["transfer", "10", "Desc", "Food"], FormError::UnknownKind("transfer".into())),
            (["income", "abc", "Desc", "Food"], FormError::InvalidAmount("abc".into())),
            (["income", "0", "Desc", "Food"], FormError::NonPositiveAmount),
            (["income", "-5", "Desc", "Food"], FormError::NonPositiveAmount),
            (["income", "5", "ab", "Food"], FormError::ShortDescription),
            (["income", "5", "Desc", "  "], FormError::EmptyCategory),
        ];
        for (args, expected) in cases {
            let form = TransactionForm::from_args(&args, USAGE).unwrap();
            assert_eq!(form.into_input(&locale, today()), Err(expected));
        }
    }

    #[test]
    fn wrong_arity_reports_usage() {
        assert_eq!(
            TransactionForm::from_args(&["income", "5"], USAGE),
            Err(FormError::Usage(USAGE))
        );
    }
}
