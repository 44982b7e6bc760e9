//! Price value handling for the list-price meta.
//!
//! Stored values are normalized decimal strings ("19.99", "1250"). Submitted
//! form values pass through [`normalize_price`] before any write; display
//! formatting happens at the edge via [`format_price`].

use rust_decimal::Decimal;

use crate::settings::strip_tags;

/// Outcome of normalizing a submitted price field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceInput {
    /// Blank after cleaning: any stored value must be removed.
    Empty,
    /// A non-negative decimal, normalized for storage.
    Value(String),
    /// Non-empty but not a usable decimal: the field is ignored.
    Rejected,
}

/// Cleans and parses a submitted price value.
///
/// Markup is stripped and thousands separators (commas) are dropped before
/// parsing. Negative amounts and non-decimal text are rejected rather than
/// stored.
#[must_use]
pub fn normalize_price(raw: &str) -> PriceInput {
    let cleaned = strip_tags(raw).trim().replace(',', "");
    if cleaned.is_empty() {
        return PriceInput::Empty;
    }
    match cleaned.parse::<Decimal>() {
        Ok(amount) if amount.is_sign_negative() => PriceInput::Rejected,
        Ok(amount) => PriceInput::Value(amount.normalize().to_string()),
        Err(_) => PriceInput::Rejected,
    }
}

/// Formats a stored price with the configured currency symbol and a fixed
/// number of decimal places, e.g. `("$", 2, "19.9")` -> `"$19.90"`.
///
/// Returns `None` when the stored value does not parse as a non-negative
/// decimal; the save path never writes such values, but the formatter does
/// not trust the store.
#[must_use]
pub fn format_price(symbol: &str, decimals: u32, value: &str) -> Option<String> {
    let mut amount = value.trim().parse::<Decimal>().ok()?;
    if amount.is_sign_negative() {
        return None;
    }
    amount = amount.round_dp(decimals);
    amount.rescale(decimals);
    Some(format!("{symbol}{amount}"))
}
