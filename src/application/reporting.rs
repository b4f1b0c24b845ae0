use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{AmountParser, Cents, LedgerRow, MalformedRow, ValidationError, DATE_FORMAT};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total: Cents,
    pub count: usize,
    pub categories: Vec<CategorySummary>,
    pub months: Vec<PeriodTotal>,
    pub dates: Vec<PeriodTotal>,
    /// Rows left out of every total above.
    pub warnings: Vec<MalformedRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total: Cents,
    pub count: usize,
    pub average: Cents,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodTotal {
    pub period: String,
    pub total: Cents,
    pub count: usize,
}

#[derive(Default)]
struct Bucket {
    total: Cents,
    count: usize,
}

impl Bucket {
    fn add(&mut self, amount: Cents) -> Result<(), ValidationError> {
        self.total = checked_sum(self.total, amount)?;
        self.count += 1;
        Ok(())
    }
}

fn checked_sum(total: Cents, amount: Cents) -> Result<Cents, ValidationError> {
    total.checked_add(amount).ok_or(ValidationError::TotalOverflow)
}

impl Summary {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

/// Aggregate valid expenses; malformed rows are collected as warnings and
/// contribute nothing to the totals.
///
/// Fails with [`ValidationError::TotalOverflow`] when a sum leaves the `i64`
/// cent range.
pub fn summarize<'a>(
    rows: impl IntoIterator<Item = &'a LedgerRow>,
) -> Result<Summary, ValidationError> {
    let mut total: Cents = 0;
    let mut count = 0;
    let mut categories: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut months: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut dates: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut warnings = Vec::new();

    for row in rows {
        match row {
            LedgerRow::Expense(expense) => {
                total = checked_sum(total, expense.amount)?;
                count += 1;
                categories
                    .entry(expense.category.clone())
                    .or_default()
                    .add(expense.amount)?;
                months.entry(expense.month()).or_default().add(expense.amount)?;
                dates
                    .entry(expense.date.format(DATE_FORMAT).to_string())
                    .or_default()
                    .add(expense.amount)?;
            }
            LedgerRow::Malformed(row) => warnings.push(row.clone()),
        }
    }

    let categories = categories
        .into_iter()
        .map(|(category, bucket)| CategorySummary {
            category,
            total: bucket.total,
            count: bucket.count,
            average: bucket.total / bucket.count as Cents,
            percentage: if total != 0 {
                (bucket.total as f64 / total as f64) * 100.0
            } else {
                0.0
            },
        })
        .collect();

    Ok(Summary {
        total,
        count,
        categories,
        months: into_periods(months),
        dates: into_periods(dates),
        warnings,
    })
}

fn into_periods(buckets: BTreeMap<String, Bucket>) -> Vec<PeriodTotal> {
    buckets
        .into_iter()
        .map(|(period, bucket)| PeriodTotal {
            period,
            total: bucket.total,
            count: bucket.count,
        })
        .collect()
}

/// One-line grand total with thousands grouping, e.g. `Total: 1,234.56 (3 expenses)`.
pub fn show_total<'a>(
    rows: impl IntoIterator<Item = &'a LedgerRow>,
    parser: &dyn AmountParser,
) -> Result<String, ValidationError> {
    let summary = summarize(rows)?;
    let noun = if summary.count == 1 { "expense" } else { "expenses" };
    let mut line = format!(
        "Total: {} ({} {})",
        parser.format_grouped(summary.total),
        summary.count,
        noun
    );
    match summary.warning_count() {
        0 => {}
        1 => line.push_str(", 1 malformed row excluded"),
        n => line.push_str(&format!(", {} malformed rows excluded", n)),
    }
    Ok(line)
}
