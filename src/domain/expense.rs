use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AmountParser, Cents, ValidationError};

/// Column headers of the ledger file, in order.
pub const HEADERS: [&str; 4] = ["Date", "Amount", "Category", "Description"];

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single spending entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub date: NaiveDate,
    pub amount: Cents,
    pub category: String,
    pub description: String,
}

impl Expense {
    pub fn new(date: NaiveDate, amount: Cents, category: impl Into<String>) -> Self {
        Self {
            date,
            amount,
            category: category.into().trim().to_string(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into().trim().to_string();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        Ok(())
    }

    /// Calendar month as `YYYY-MM`.
    pub fn month(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

/// A line of the ledger file that could not be read as an [`Expense`].
/// Its fields are kept verbatim so saving the ledger writes them back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedRow {
    /// 1-based line in the ledger file.
    pub line: usize,
    pub fields: Vec<String>,
    pub reason: String,
}

impl MalformedRow {
    pub fn field(&self, i: usize) -> &str {
        self.fields.get(i).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerRow {
    Expense(Expense),
    Malformed(MalformedRow),
}

impl LedgerRow {
    pub fn as_expense(&self) -> Option<&Expense> {
        match self {
            LedgerRow::Expense(expense) => Some(expense),
            LedgerRow::Malformed(_) => None,
        }
    }

    pub fn as_malformed(&self) -> Option<&MalformedRow> {
        match self {
            LedgerRow::Expense(_) => None,
            LedgerRow::Malformed(row) => Some(row),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, LedgerRow::Malformed(_))
    }
}

impl From<Expense> for LedgerRow {
    fn from(expense: Expense) -> Self {
        LedgerRow::Expense(expense)
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(input.trim().to_string()))
}

/// Unvalidated expense fields as text, e.g. while a user edits an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub date: String,
    pub amount: String,
    pub category: String,
    pub description: String,
}

impl ExpenseDraft {
    /// Text form of an existing row; malformed rows contribute their raw fields.
    pub fn from_row(row: &LedgerRow, parser: &dyn AmountParser) -> Self {
        match row {
            LedgerRow::Expense(expense) => Self {
                date: expense.date.format(DATE_FORMAT).to_string(),
                amount: parser.format(expense.amount),
                category: expense.category.clone(),
                description: expense.description.clone(),
            },
            LedgerRow::Malformed(row) => Self {
                date: row.field(0).to_string(),
                amount: row.field(1).to_string(),
                category: row.field(2).to_string(),
                description: row.field(3).to_string(),
            },
        }
    }

    pub fn into_expense(self, parser: &dyn AmountParser) -> Result<Expense, ValidationError> {
        let date = parse_date(&self.date)?;
        let amount = parser
            .parse(&self.amount)
            .map_err(|e| ValidationError::from_amount(&self.amount, parser.separator(), e))?;
        let expense = Expense::new(date, amount, self.category).with_description(self.description);
        expense.validate()?;
        Ok(expense)
    }
}
