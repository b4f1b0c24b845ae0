use std::fmt;

use chrono::NaiveDate;

use super::{
    format_amount, parse_date, DecimalSeparator, Expense, LedgerRow, MalformedRow, ValidationError,
};

/// Criteria selecting a subset of the ledger. All set criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Case-insensitive exact category match
    pub category: Option<String>,
    /// Inclusive lower date bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper date bound
    pub to: Option<NaiveDate>,
    /// Case-insensitive substring searched in every field
    pub text: Option<String>,
}

impl Filter {
    pub fn new(
        category: Option<String>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        text: Option<String>,
    ) -> Result<Self, ValidationError> {
        let filter = Self {
            category: non_blank(category),
            from,
            to,
            text: non_blank(text),
        };
        filter.validate()?;
        Ok(filter)
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: non_blank(Some(category.into())),
            ..Self::default()
        }
    }

    /// Parse menu terms such as `category=Food from=2025-01-01 coffee`.
    /// Bare words are joined into the text search.
    pub fn parse_terms<'a>(terms: impl IntoIterator<Item = &'a str>) -> Result<Self, ValidationError> {
        let mut category = None;
        let mut from = None;
        let mut to = None;
        let mut words: Vec<&str> = Vec::new();

        for term in terms {
            match term.split_once('=') {
                Some((key, value)) => match key.to_lowercase().as_str() {
                    "category" | "cat" => category = Some(value.to_string()),
                    "from" | "start" => from = Some(parse_date(value)?),
                    "to" | "end" => to = Some(parse_date(value)?),
                    "text" | "q" => words.push(value),
                    other => {
                        return Err(ValidationError::InvalidFilter(format!(
                            "unknown key '{}' (use category=, from=, to=, text=)",
                            other
                        )));
                    }
                },
                None => words.push(term),
            }
        }

        let text = if words.is_empty() {
            None
        } else {
            Some(words.join(" "))
        };
        Self::new(category, from, to, text)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ValidationError::InvalidFilter(format!(
                    "start date {} is after end date {}",
                    from, to
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.from.is_none() && self.to.is_none() && self.text.is_none()
    }

    pub fn matches(&self, expense: &Expense, separator: DecimalSeparator) -> bool {
        if let Some(category) = &self.category {
            if !same_category(&expense.category, category) {
                return false;
            }
        }
        if self.from.is_some_and(|from| expense.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| expense.date > to) {
            return false;
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let haystack = format!(
                "{} {} {} {}",
                expense.date,
                format_amount(expense.amount, separator),
                expense.category,
                expense.description
            )
            .to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        true
    }

    pub fn matches_row(&self, row: &LedgerRow, separator: DecimalSeparator) -> bool {
        match row {
            LedgerRow::Expense(expense) => self.matches(expense, separator),
            LedgerRow::Malformed(row) => self.matches_raw(row),
        }
    }

    /// Match a malformed row on its raw fields. Date bounds only match a
    /// date column that parses.
    pub fn matches_raw(&self, row: &MalformedRow) -> bool {
        if let Some(category) = &self.category {
            if !same_category(row.field(2).trim(), category) {
                return false;
            }
        }
        if self.from.is_some() || self.to.is_some() {
            let Ok(date) = parse_date(row.field(0)) else {
                return false;
            };
            if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let haystack = row.fields.join(" ").to_lowercase();
            if !haystack.contains(&text.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(category) = &self.category {
            parts.push(format!("category={}", category));
        }
        if let Some(from) = self.from {
            parts.push(format!("from={}", from));
        }
        if let Some(to) = self.to {
            parts.push(format!("to={}", to));
        }
        if let Some(text) = &self.text {
            parts.push(format!("text={}", text));
        }
        if parts.is_empty() {
            write!(f, "all")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

fn same_category(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
