//! Price formatting and parsing helpers.
//!
//! Prices are shown in the Brazilian Real style used by the labels:
//! a `R$ ` prefix, two fixed decimals and a comma decimal separator.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Currency prefix shown before every price.
pub const CURRENCY_PREFIX: &str = "R$ ";

/// Display string used for missing, invalid or negative prices.
pub const ZERO_PRICE_DISPLAY: &str = "R$ 0,00";

/// Round a price to exactly two decimals, folding negative zero into zero.
///
/// The scale is always 2, so `12.5` becomes `12.50` when serialized.
pub fn round_price(price: Decimal) -> Decimal {
    let mut rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }
    rounded.rescale(2);
    rounded
}

/// Format a price for display.
///
/// Negative prices are treated as invalid and shown as [`ZERO_PRICE_DISPLAY`].
///
/// # Example
///
/// ```
/// use esl_price_sync::format_price;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_price(Decimal::new(2745, 2)), "R$ 27,45");
/// ```
pub fn format_price(price: Decimal) -> String {
    if price.is_sign_negative() && !price.is_zero() {
        return ZERO_PRICE_DISPLAY.to_string();
    }
    let fixed = format!("{:.2}", round_price(price));
    format!("{}{}", CURRENCY_PREFIX, fixed.replace('.', ","))
}

/// Format a raw, possibly missing, textual price.
///
/// Anything that is not a number yields [`ZERO_PRICE_DISPLAY`].
pub fn format_price_text(input: Option<&str>) -> String {
    input
        .and_then(parse_number)
        .map(format_price)
        .unwrap_or_else(|| ZERO_PRICE_DISPLAY.to_string())
}

/// Parse a formatted display string (e.g. `R$ 27,45`) back into a number.
pub fn parse_display(display: &str) -> Option<Decimal> {
    parse_number(display)
}

/// Validate a typed price before it is sent to a label.
///
/// Accepts either `.` or `,` as the decimal separator and an optional
/// currency prefix. The result is rounded to two decimals.
///
/// # Errors
///
/// Returns [`Error::MalformedPrice`] for empty, non-numeric, negative or
/// out-of-range input.
pub fn parse_price(input: &str, max_price: Decimal) -> Result<Decimal> {
    if input.trim().is_empty() {
        return Err(Error::malformed(input, "no price entered"));
    }

    let value =
        parse_number(input).ok_or_else(|| Error::malformed(input, "not a number"))?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::malformed(input, "price cannot be negative"));
    }

    let value = round_price(value);
    if value > max_price {
        return Err(Error::malformed(
            input,
            format!("price exceeds the maximum of {}", format_price(max_price)),
        ));
    }

    Ok(value)
}

fn parse_number(input: &str) -> Option<Decimal> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix(CURRENCY_PREFIX.trim_end())
        .unwrap_or(trimmed)
        .trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(&trimmed.replace(',', ".")).ok()
}
