use thiserror::Error;

use super::{DecimalSeparator, ParseAmountError};

/// Input that would put the ledger into a bad state. Every operation that
/// returns one of these leaves the ledger file untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Category must not be empty")]
    EmptyCategory,

    #[error("Index {index} is out of range ({len} rows available)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Ambiguous amount '{input}': use '{expected}' as the decimal separator (e.g. 12{expected}50)")]
    AmbiguousAmount { input: String, expected: char },

    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },

    #[error("Invalid date '{0}': use YYYY-MM-DD (e.g. 2025-09-25)")]
    InvalidDate(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unknown decimal separator '{0}': use '.' or ','")]
    UnknownSeparator(String),

    #[error("Nothing to export")]
    NothingToExport,

    #[error("The ledger is empty")]
    EmptyLedger,

    #[error("Total is out of range; check for mistyped amounts")]
    TotalOverflow,
}

impl ValidationError {
    pub fn from_amount(input: &str, separator: DecimalSeparator, err: ParseAmountError) -> Self {
        match err {
            ParseAmountError::Ambiguous { .. } => ValidationError::AmbiguousAmount {
                input: input.to_string(),
                expected: separator.as_char(),
            },
            other => ValidationError::InvalidAmount {
                input: input.to_string(),
                reason: other.to_string(),
            },
        }
    }
}
