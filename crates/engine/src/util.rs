//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

/// Collapse internal whitespace and trim a user supplied name.
pub(crate) fn normalize_display(input: &str, label: &str) -> ResultEngine<String> {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    if collapsed.chars().count() > 100 {
        return Err(EngineError::InvalidName(format!(
            "{label} name must be at most 100 characters"
        )));
    }
    Ok(collapsed)
}

/// Uniqueness key for names: NFKD, combining marks stripped, lowercase
/// alphanumerics separated by single spaces.
pub(crate) fn normalize_key(input: &str, label: &str) -> ResultEngine<String> {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let normalized = out.trim();
    if normalized.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must contain letters or digits"
        )));
    }
    Ok(normalized.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Parse a UUID from user input and return a labeled error on failure.
pub fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Parse a currency code stored in the DB into a strongly typed `Currency`.
pub(crate) fn model_currency(value: &str) -> ResultEngine<Currency> {
    Currency::try_from(value)
        .map_err(|_| EngineError::InvalidAmount(format!("invalid currency: {value}")))
}

/// Ensure a currency matches the merchant base currency.
pub(crate) fn ensure_base_currency(base: Currency, actual: Currency) -> ResultEngine<()> {
    if base != actual {
        return Err(EngineError::CurrencyMismatch(format!(
            "merchant currency is {}, got {}",
            base.code(),
            actual.code()
        )));
    }
    Ok(())
}
