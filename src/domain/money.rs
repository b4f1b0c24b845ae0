use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Which character separates units from cents in amounts typed by the user
/// and written to the ledger file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    /// `12.50`, grouped as `1,234.56`
    #[default]
    Point,
    /// `12,50`, grouped as `1.234,56`
    Comma,
}

impl DecimalSeparator {
    pub fn as_char(self) -> char {
        match self {
            DecimalSeparator::Point => '.',
            DecimalSeparator::Comma => ',',
        }
    }

    /// The character used between groups of thousands.
    pub fn grouping_char(self) -> char {
        match self {
            DecimalSeparator::Point => ',',
            DecimalSeparator::Comma => '.',
        }
    }

    /// Select the amount parser for this separator.
    pub fn parser(self) -> Box<dyn AmountParser> {
        match self {
            DecimalSeparator::Point => Box::new(PointDecimal),
            DecimalSeparator::Comma => Box::new(CommaDecimal),
        }
    }
}

impl fmt::Display for DecimalSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for DecimalSeparator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "." | "point" | "dot" => Ok(DecimalSeparator::Point),
            "," | "comma" => Ok(DecimalSeparator::Comma),
            other => Err(ValidationError::UnknownSeparator(other.to_string())),
        }
    }
}

/// Strategy for reading and writing amounts in one decimal convention.
pub trait AmountParser {
    fn separator(&self) -> DecimalSeparator;

    fn parse(&self, input: &str) -> Result<Cents, ParseAmountError> {
        parse_amount(input, self.separator())
    }

    /// Plain form used in the ledger file, e.g. `1234.56`.
    fn format(&self, cents: Cents) -> String {
        format_amount(cents, self.separator())
    }

    /// Display form with thousands grouping, e.g. `1,234.56`.
    fn format_grouped(&self, cents: Cents) -> String {
        format_grouped(cents, self.separator())
    }
}

/// `12.50`
#[derive(Debug, Clone, Copy, Default)]
pub struct PointDecimal;

impl AmountParser for PointDecimal {
    fn separator(&self) -> DecimalSeparator {
        DecimalSeparator::Point
    }
}

/// `12,50`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaDecimal;

impl AmountParser for CommaDecimal {
    fn separator(&self) -> DecimalSeparator {
        DecimalSeparator::Comma
    }
}

/// Format cents with the given decimal separator and no grouping.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_amount(cents: Cents, separator: DecimalSeparator) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}{}{:02}", sign, units, separator.as_char(), remainder)
}

/// Format cents with thousands grouping.
/// Example: 123456789 -> "1,234,567.89" (point) or "1.234.567,89" (comma)
pub fn format_grouped(cents: Cents, separator: DecimalSeparator) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    let units = (abs_cents / 100).to_string();
    let remainder = abs_cents % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(separator.grouping_char());
        }
        grouped.push(digit);
    }

    format!("{}{}{}{:02}", sign, grouped, separator.as_char(), remainder)
}

/// Parse a decimal string into cents using exactly one decimal separator.
///
/// Input containing the other convention's separator is refused rather than
/// guessed at: under [`DecimalSeparator::Point`], `"12,50"` could mean twelve
/// and a half or one thousand two hundred fifty.
pub fn parse_amount(input: &str, separator: DecimalSeparator) -> Result<Cents, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }
    if input.contains(separator.grouping_char()) {
        return Err(ParseAmountError::Ambiguous {
            expected: separator.as_char(),
        });
    }

    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    let parts: Vec<&str> = digits.split(separator.as_char()).collect();
    let (whole, fraction) = match parts.as_slice() {
        [whole] => (*whole, ""),
        [whole, fraction] => (*whole, *fraction),
        _ => return Err(ParseAmountError::InvalidFormat),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseAmountError::InvalidFormat);
    }
    if fraction.len() > 2 {
        return Err(ParseAmountError::TooManyDecimals);
    }

    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseAmountError::Overflow)?
    };

    // Single digit like "5" means 50 cents
    let decimal_cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| ParseAmountError::InvalidFormat)? * 10,
        _ => fraction.parse().map_err(|_| ParseAmountError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseAmountError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat,
    TooManyDecimals,
    Overflow,
    Ambiguous { expected: char },
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "amount is empty"),
            ParseAmountError::InvalidFormat => write!(f, "not a number"),
            ParseAmountError::TooManyDecimals => write!(f, "at most 2 decimal places"),
            ParseAmountError::Overflow => write!(f, "amount is too large"),
            ParseAmountError::Ambiguous { expected } => {
                write!(f, "ambiguous separator, expected '{}'", expected)
            }
        }
    }
}

impl std::error::Error for ParseAmountError {}
