// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use expense_ledger::application::LedgerService;
use expense_ledger::domain::{Cents, DecimalSeparator, Expense};
use tempfile::TempDir;

/// Helper to create a test service over a ledger file in a temporary directory.
/// The file itself is not created.
pub fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("data").join("expenses.csv");
    let service = LedgerService::open(path, DecimalSeparator::Point);
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn expense(date: &str, amount: Cents, category: &str, description: &str) -> Expense {
    Expense::new(parse_date(date), amount, category).with_description(description)
}

/// Write raw ledger content, bypassing validation.
pub fn write_raw(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Test fixture: a small ledger spanning two months and three categories.
pub struct StandardLedger;

impl StandardLedger {
    /// Index: category, amount
    /// 0: Food 12.50, 1: Transport 2.80, 2: Food 7.20, 3: Rent 950.00, 4: Food 31.00
    pub fn create(service: &LedgerService) -> Result<()> {
        service.add(expense("2025-01-03", 1250, "Food", "lunch"))?;
        service.add(expense("2025-01-04", 280, "Transport", "bus ticket"))?;
        service.add(expense("2025-01-10", 720, "Food", "groceries"))?;
        service.add(expense("2025-02-01", 95000, "Rent", "February rent"))?;
        service.add(expense("2025-02-03", 3100, "Food", "dinner out"))?;
        Ok(())
    }
}
