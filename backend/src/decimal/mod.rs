//! Comma-decimal text conversion.
//!
//! Monetary values travel as text with exactly two fractional digits and a
//! comma separator (`"1,50"`). Arithmetic happens on [`Decimal`], never on
//! floats, so `10,00 - 0,50` is exactly `9,50`.
//!
//! ```rust,ignore
//! use nfadjust::decimal::{format, parse};
//!
//! let value = parse("10,00")? + parse("-0.5")?;
//! assert_eq!(format(value), "9,50");
//! ```

pub mod input;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::{DecimalError, DecimalResult};

pub use input::{DecimalInput, InputCheck, InputState, FORMAT_HINT};

/// Number of fractional digits in every formatted value.
pub const SCALE: u32 = 2;

/// Optional sign, digits, at most one `.` (after comma normalization).
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$").expect("valid number regex"));

/// Render a value with two fractional digits and a comma separator.
///
/// Rounds half away from zero. Zero is always rendered unsigned. Values too
/// wide to carry a scale of two still get both fractional digits.
pub fn format(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    let text = rounded.to_string();
    let (integer, fraction) = text.split_once('.').unwrap_or((&text, ""));
    format!("{},{:0<2}", integer, fraction)
}

/// Like [`format`], but an absent value renders as the empty marker.
pub fn format_opt(value: Option<Decimal>) -> String {
    value.map(format).unwrap_or_default()
}

/// Read a decimal written with either `,` or `.` as separator.
///
/// Empty or whitespace-only text is zero. Text with more than one separator,
/// or anything other than an optional sign and digits, is rejected.
pub fn parse(text: &str) -> DecimalResult<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let separators = trimmed.chars().filter(|c| matches!(c, ',' | '.')).count();
    if separators > 1 {
        return Err(DecimalError::Malformed(text.to_string()));
    }

    let normalized = trimmed.replace(',', ".");
    if !NUMBER.is_match(&normalized) {
        return Err(DecimalError::Malformed(text.to_string()));
    }

    Decimal::from_str(&normalized).map_err(|_| DecimalError::Malformed(text.to_string()))
}

/// [`parse`], treating malformed text as zero.
pub fn parse_or_zero(text: &str) -> Decimal {
    parse(text).unwrap_or(Decimal::ZERO)
}
