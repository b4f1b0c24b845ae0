mod common;

use anyhow::Result;
use common::{test_service, write_raw, StandardLedger};
use expense_ledger::application::{show_total, LedgerError};
use expense_ledger::domain::{Expense, Filter, ValidationError};

#[test]
fn test_malformed_row_is_excluded_from_totals() -> Result<()> {
    let (service, _temp) = test_service()?;
    write_raw(
        service.store().path(),
        "Date,Amount,Category,Description\n\
         2025-01-01,10.00,Food,breakfast\n\
         2025-01-01,abc,Food,typo\n\
         2025-01-02,5.25,Transport,tram\n",
    )?;

    let summary = service.summary(None)?;
    assert_eq!(summary.total, 1525);
    assert_eq!(summary.count, 2);
    assert_eq!(summary.warning_count(), 1);
    assert_eq!(summary.warnings[0].line, 3);
    assert!(summary.warnings[0].reason.contains("abc"));

    // Same total as the ledger without the bad line.
    let (clean, _temp2) = test_service()?;
    write_raw(
        clean.store().path(),
        "Date,Amount,Category,Description\n\
         2025-01-01,10.00,Food,breakfast\n\
         2025-01-02,5.25,Transport,tram\n",
    )?;
    assert_eq!(clean.summary(None)?.total, summary.total);
    assert_eq!(clean.summary(None)?.warning_count(), 0);

    Ok(())
}

#[test]
fn test_short_and_long_rows_are_malformed() -> Result<()> {
    let (service, _temp) = test_service()?;
    write_raw(
        service.store().path(),
        "2025-01-01,10.00,Food\n\
         2025-01-02,1.00,Food,tea,extra\n\
         2025-13-40,1.00,Food,bad date\n\
         2025-01-03,2.00,,no category\n\
         2025-01-04,3.00,Food,fine\n",
    )?;

    let summary = service.summary(None)?;
    assert_eq!(summary.count, 1);
    assert_eq!(summary.total, 300);
    assert_eq!(summary.warning_count(), 4);
    let lines: Vec<usize> = summary.warnings.iter().map(|w| w.line).collect();
    assert_eq!(lines, vec![1, 2, 3, 4]);

    Ok(())
}

#[test]
fn test_summary_by_category_and_month() -> Result<()> {
    let (service, _temp) = test_service()?;
    StandardLedger::create(&service)?;

    let summary = service.summary(None)?;
    assert_eq!(summary.total, 1250 + 280 + 720 + 95000 + 3100);
    assert_eq!(summary.count, 5);

    let categories: Vec<(&str, i64, usize)> = summary
        .categories
        .iter()
        .map(|c| (c.category.as_str(), c.total, c.count))
        .collect();
    assert_eq!(
        categories,
        vec![("Food", 5070, 3), ("Rent", 95000, 1), ("Transport", 280, 1)]
    );
    assert_eq!(summary.categories[0].average, 1690);

    let months: Vec<(&str, i64)> = summary
        .months
        .iter()
        .map(|m| (m.period.as_str(), m.total))
        .collect();
    assert_eq!(months, vec![("2025-01", 2250), ("2025-02", 98100)]);

    let percent: f64 = summary.categories.iter().map(|c| c.percentage).sum();
    assert!((percent - 100.0).abs() < 0.001);

    Ok(())
}

#[test]
fn test_summary_respects_filter() -> Result<()> {
    let (service, _temp) = test_service()?;
    StandardLedger::create(&service)?;

    let filter = Filter::parse_terms(["from=2025-02-01"])?;
    let summary = service.summary(Some(&filter))?;
    assert_eq!(summary.count, 2);
    assert_eq!(summary.total, 98100);
    assert_eq!(summary.months.len(), 1);

    Ok(())
}

#[test]
fn test_total_line_groups_thousands() -> Result<()> {
    let (service, _temp) = test_service()?;
    StandardLedger::create(&service)?;

    let view = service.view(None)?;
    assert_eq!(
        show_total(view.rows(), service.parser())?,
        "Total: 1,003.50 (5 expenses)"
    );

    Ok(())
}

#[test]
fn test_total_line_mentions_excluded_rows() -> Result<()> {
    let (service, _temp) = test_service()?;
    write_raw(
        service.store().path(),
        "Date,Amount,Category,Description\n\
         2025-01-01,10.00,Food,breakfast\n\
         2025-01-01,abc,Food,typo\n",
    )?;

    let view = service.view(None)?;
    assert_eq!(
        show_total(view.rows(), service.parser())?,
        "Total: 10.00 (1 expense), 1 malformed row excluded"
    );

    Ok(())
}

#[test]
fn test_empty_ledger_totals() -> Result<()> {
    let (service, _temp) = test_service()?;
    service.init()?;

    let summary = service.summary(None)?;
    assert_eq!(summary.total, 0);
    assert_eq!(summary.count, 0);
    assert!(summary.categories.is_empty());

    Ok(())
}

#[test]
fn test_filtered_summary_keeps_malformed_row_warnings() -> Result<()> {
    let (service, _temp) = test_service()?;
    write_raw(
        service.store().path(),
        "Date,Amount,Category,Description\n\
         2025-01-01,10.00,Food,breakfast\n\
         2025-01-01,abc,Food,typo\n\
         2025-01-02,5.25,Transport,tram\n\
         2025-01-03,x,Transport,bad\n",
    )?;

    let food = service.summary(Some(&Filter::category("Food")))?;
    assert_eq!(food.total, 1000);
    assert_eq!(food.warning_count(), 1);
    assert_eq!(food.warnings[0].line, 3);

    let january = Filter::parse_terms(["from=2025-01-02"])?;
    let summary = service.summary(Some(&january))?;
    assert_eq!(summary.total, 525);
    assert_eq!(summary.warning_count(), 1);
    assert_eq!(summary.warnings[0].line, 5);

    let view = service.view(Some(&Filter::category("food")))?;
    assert_eq!(
        show_total(view.rows(), service.parser())?,
        "Total: 10.00 (1 expense), 1 malformed row excluded"
    );

    Ok(())
}

#[test]
fn test_summary_overflow_is_reported() -> Result<()> {
    let (service, _temp) = test_service()?;
    let huge = service.parse_amount("50000000000000000.00")?;
    let date = common::parse_date("2025-01-01");
    service.add(Expense::new(date, huge, "Rent"))?;
    service.add(Expense::new(date, huge, "Rent"))?;

    let result = service.summary(None);
    assert!(matches!(
        result,
        Err(LedgerError::Validation(ValidationError::TotalOverflow))
    ));

    let view = service.view(None)?;
    assert_eq!(
        show_total(view.rows(), service.parser()),
        Err(ValidationError::TotalOverflow)
    );

    // A single huge amount still sums.
    service.undo_last()?;
    assert_eq!(service.summary(None)?.total, huge);

    Ok(())
}
