//! Locale-aware formatting and parsing of monetary amounts.

use serde::{Deserialize, Serialize};

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("BRL")
    }
}

/// Separators used when rendering and reading numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
}

impl LocaleConfig {
    pub fn pt_br() -> Self {
        Self {
            language_tag: "pt-BR".into(),
            decimal_separator: ',',
            grouping_separator: '.',
        }
    }

    pub fn en_us() -> Self {
        Self {
            language_tag: "en-US".into(),
            decimal_separator: '.',
            grouping_separator: ',',
        }
    }

    /// Resolves a language tag to known separators. Unknown tags fall back to `pt-BR`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "en-us" | "en-gb" | "en" => Self {
                language_tag: tag.trim().to_string(),
                ..Self::en_us()
            },
            "de-de" | "es-es" | "it-it" | "pt-pt" => Self {
                language_tag: tag.trim().to_string(),
                ..Self::pt_br()
            },
            _ => Self::pt_br(),
        }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self::pt_br()
    }
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "BRL" => "R$".into(),
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        _ => code.into(),
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

pub fn format_number(locale: &LocaleConfig, value: f64, precision: u8) -> String {
    let body = format!("{:.*}", precision as usize, value);
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (body.as_str(), None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let grouped = group_digits(digits, locale.grouping_separator);
    match frac_part {
        Some(frac) => format!("{}{}{}{}", sign, grouped, locale.decimal_separator, frac),
        None => format!("{}{}", sign, grouped),
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx != 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}

/// Renders `amount` as `R$ 1.234,56` style text.
///
/// Negative amounts are prefixed with `-`. When `show_sign` is set, positive
/// amounts get a leading `+` so income stands out next to expenses.
pub fn format_amount(
    amount: f64,
    code: &CurrencyCode,
    locale: &LocaleConfig,
    show_sign: bool,
) -> String {
    let precision = minor_units_for(code.as_str());
    let body = format_number(locale, amount.abs(), precision);
    let symbol = symbol_for(code.as_str());
    let formatted = format!("{} {}", symbol, body);
    let nonzero = body.chars().any(|c| c.is_ascii_digit() && c != '0');
    if amount < 0.0 && nonzero {
        format!("-{}", formatted)
    } else if show_sign && amount > 0.0 && nonzero {
        format!("+{}", formatted)
    } else {
        formatted
    }
}

/// Parses user-entered amounts such as `R$ 1.234,56` or `85`.
///
/// Returns `None` when the text is empty, not a number, or not finite.
pub fn parse_amount(text: &str, locale: &LocaleConfig) -> Option<f64> {
    let mut cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    for code in ["BRL", "USD", "EUR", "GBP", "JPY"] {
        cleaned = cleaned.replace(&symbol_for(code), "");
        cleaned = cleaned.replace(code, "");
    }
    let normalized: String = cleaned
        .chars()
        .filter(|c| *c != locale.grouping_separator)
        .map(|c| {
            if c == locale.decimal_separator {
                '.'
            } else {
                c
            }
        })
        .collect();
    if normalized.is_empty() {
        return None;
    }
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
