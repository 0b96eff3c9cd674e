//! Exact money handling in integer minor units.
//!
//! The gateway speaks decimal strings ("9.99"); everything internal uses
//! `i64` minor units. Floating point never touches an amount.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reasons a decimal amount string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("amount is empty")]
    Empty,

    #[error("negative amounts are not accepted")]
    Negative,

    #[error("amount contains more than one decimal point")]
    MultipleDecimalPoints,

    #[error("amount has more than two fractional digits")]
    TooManyFractionDigits,

    #[error("amount contains invalid character '{0}'")]
    InvalidCharacter(char),

    #[error("amount exceeds the representable range")]
    Overflow,
}

/// Converts a decimal string such as `"9.99"` or `"+10"` to minor units.
///
/// Surrounding whitespace is ignored. A single leading `+` is allowed, a `-`
/// is rejected, and at most two fractional digits are accepted.
pub fn decimal_to_minor(input: &str) -> Result<i64, MoneyError> {
    let trimmed = input.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if unsigned.starts_with('-') {
        return Err(MoneyError::Negative);
    }

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((_, rest)) if rest.contains('.') => return Err(MoneyError::MultipleDecimalPoints),
        Some((whole, fraction)) => (whole, fraction),
        None => (unsigned, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(MoneyError::Empty);
    }
    if fraction.len() > 2 {
        return Err(MoneyError::TooManyFractionDigits);
    }
    if let Some(bad) = whole.chars().chain(fraction.chars()).find(|c| !c.is_ascii_digit()) {
        return Err(MoneyError::InvalidCharacter(bad));
    }

    let mut units: i64 = 0;
    for digit in whole.bytes() {
        units = units
            .checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(digit - b'0')))
            .ok_or(MoneyError::Overflow)?;
    }

    let mut cents: i64 = 0;
    for position in 0..2 {
        let digit = fraction.as_bytes().get(position).map_or(0, |d| d - b'0');
        cents = cents * 10 + i64::from(digit);
    }

    units
        .checked_mul(100)
        .and_then(|v| v.checked_add(cents))
        .ok_or(MoneyError::Overflow)
}

/// Formats minor units with exactly two fractional digits, keeping the sign.
pub fn minor_to_decimal(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let magnitude = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
}

/// An amount in integer minor units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Parses a gateway decimal string.
    pub fn from_decimal(input: &str) -> Result<Self, MoneyError> {
        decimal_to_minor(input).map(Self)
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    /// Decimal string used in signed gateway parameters.
    pub fn to_decimal(&self) -> String {
        minor_to_decimal(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}
