use std::fmt::Write;

use crate::application::{FilteredView, PeriodTotal, Summary};
use crate::domain::{AmountParser, LedgerRow, DATE_FORMAT};

/// Column width caps for free-text columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub category_width: usize,
    pub description_width: usize,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            category_width: 16,
            description_width: 32,
        }
    }
}

/// Shorten `s` to at most `max_len` characters, marking the cut with `…`.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max_len - 1).collect();
    out.push('…');
    out
}

fn column_width<'a>(header: &str, cells: impl Iterator<Item = &'a String>, cap: usize) -> usize {
    cells
        .map(|c| c.chars().count())
        .chain(std::iter::once(header.chars().count()))
        .max()
        .unwrap_or(0)
        .min(cap.max(header.chars().count()))
}

/// Render a view as an aligned table. The `#` column holds view indices;
/// malformed rows are flagged with `!` and listed below the table.
pub fn render_view(view: &FilteredView, parser: &dyn AmountParser, layout: TableLayout) -> String {
    if view.is_empty() {
        return if view.is_filtered() {
            "No matching expenses.".to_string()
        } else {
            "No expenses yet.".to_string()
        };
    }

    let cells: Vec<[String; 5]> = view
        .entries
        .iter()
        .map(|entry| match &entry.row {
            LedgerRow::Expense(expense) => [
                entry.view_index.to_string(),
                expense.date.format(DATE_FORMAT).to_string(),
                parser.format(expense.amount),
                expense.category.clone(),
                expense.description.clone(),
            ],
            LedgerRow::Malformed(row) => [
                format!("{}!", entry.view_index),
                row.field(0).to_string(),
                row.field(1).to_string(),
                row.field(2).to_string(),
                row.field(3).to_string(),
            ],
        })
        .collect();

    let headers = ["#", "DATE", "AMOUNT", "CATEGORY", "DESCRIPTION"];
    let caps = [usize::MAX, 10, 14, layout.category_width, layout.description_width];
    let widths: Vec<usize> = (0..5)
        .map(|col| column_width(headers[col], cells.iter().map(|row| &row[col]), caps[col]))
        .collect();

    let mut out = String::new();
    let line = |row: [&str; 5], widths: &[usize]| {
        format!(
            "{:>w0$}  {:<w1$}  {:>w2$}  {:<w3$}  {}",
            row[0],
            truncate(row[1], widths[1]),
            truncate(row[2], widths[2]),
            truncate(row[3], widths[3]),
            truncate(row[4], widths[4]),
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
        )
        .trim_end()
        .to_string()
    };

    let _ = writeln!(out, "{}", line(headers, &widths));
    let _ = writeln!(out, "{}", "-".repeat(widths.iter().sum::<usize>() + 8));
    for row in &cells {
        let _ = writeln!(
            out,
            "{}",
            line(
                [
                    row[0].as_str(),
                    row[1].as_str(),
                    row[2].as_str(),
                    row[3].as_str(),
                    row[4].as_str()
                ],
                &widths
            )
        );
    }

    let warnings: Vec<_> = view.warnings().collect();
    if !warnings.is_empty() {
        let _ = writeln!(
            out,
            "\n! {} malformed row(s) excluded from totals:",
            warnings.len()
        );
        for row in warnings {
            let _ = writeln!(out, "  line {}: {}", row.line, row.reason);
        }
    }

    out.trim_end().to_string()
}

/// Render a summary: per-category, per-month, per-date and overall totals.
pub fn render_summary(summary: &Summary, parser: &dyn AmountParser, layout: TableLayout) -> String {
    if summary.count == 0 && summary.warnings.is_empty() {
        return "No expenses yet.".to_string();
    }

    let cat_width = summary
        .categories
        .iter()
        .map(|c| c.category.chars().count())
        .max()
        .unwrap_or(0)
        .clamp("CATEGORY".len(), layout.category_width.max("CATEGORY".len()));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<cw$}  {:>14}  {:>5}  {:>12}  {:>6}",
        "CATEGORY",
        "TOTAL",
        "COUNT",
        "AVERAGE",
        "%",
        cw = cat_width
    );
    let _ = writeln!(out, "{}", "-".repeat(cat_width + 47));
    for cat in &summary.categories {
        let _ = writeln!(
            out,
            "{:<cw$}  {:>14}  {:>5}  {:>12}  {:>5.1}%",
            truncate(&cat.category, cat_width),
            parser.format_grouped(cat.total),
            cat.count,
            parser.format_grouped(cat.average),
            cat.percentage,
            cw = cat_width
        );
    }

    write_periods(&mut out, "MONTH", &summary.months, parser);
    write_periods(&mut out, "DATE", &summary.dates, parser);

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total: {} ({} expenses)",
        parser.format_grouped(summary.total),
        summary.count
    );
    if !summary.warnings.is_empty() {
        let _ = writeln!(
            out,
            "! {} malformed row(s) excluded from totals:",
            summary.warnings.len()
        );
        for row in &summary.warnings {
            let _ = writeln!(out, "  line {}: {}", row.line, row.reason);
        }
    }

    out.trim_end().to_string()
}

fn write_periods(out: &mut String, header: &str, periods: &[PeriodTotal], parser: &dyn AmountParser) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<10}  {:>14}  {:>5}", header, "TOTAL", "COUNT");
    let _ = writeln!(out, "{}", "-".repeat(33));
    for period in periods {
        let _ = writeln!(
            out,
            "{:<10}  {:>14}  {:>5}",
            period.period,
            parser.format_grouped(period.total),
            period.count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::summarize;
    use crate::domain::{parse_date, DecimalSeparator, Expense, Filter, MalformedRow, PointDecimal};

    fn view(rows: Vec<LedgerRow>) -> FilteredView {
        FilteredView::build(rows, None, DecimalSeparator::Point)
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("much too long", 8), "much to…");
        assert_eq!(truncate("café crème", 4), "caf…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_long_text_keeps_alignment() {
        let date = parse_date("2025-01-01").unwrap();
        let rows = vec![
            LedgerRow::Expense(
                Expense::new(date, 1250, "Groceries and household supplies")
                    .with_description("A very long description that goes on and on and on"),
            ),
            LedgerRow::Expense(Expense::new(date, 99, "Food").with_description("tea")),
        ];
        let layout = TableLayout {
            category_width: 10,
            description_width: 12,
        };
        let table = render_view(&view(rows), &PointDecimal, layout);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("Groceries…"));
        assert!(lines[2].contains("A very long…"));
        // Description column starts at the same offset on every row.
        let offset = lines[0].find("DESCRIPTION").unwrap();
        assert_eq!(lines[2].chars().nth(offset), Some('A'));
        assert_eq!(lines[3].chars().nth(offset), Some('t'));
    }

    #[test]
    fn test_malformed_rows_are_flagged() {
        let rows = vec![LedgerRow::Malformed(MalformedRow {
            line: 2,
            fields: vec!["2025-01-01".into(), "abc".into(), "Food".into(), "x".into()],
            reason: "non-numeric amount 'abc'".into(),
        })];
        let table = render_view(&view(rows), &PointDecimal, TableLayout::default());
        assert!(table.contains("0!"));
        assert!(table.contains("line 2: non-numeric amount 'abc'"));
    }

    #[test]
    fn test_empty_views() {
        assert_eq!(
            render_view(&view(Vec::new()), &PointDecimal, TableLayout::default()),
            "No expenses yet."
        );
        let filtered = FilteredView::build(
            Vec::new(),
            Some(&Filter::category("Food")),
            DecimalSeparator::Point,
        );
        assert_eq!(
            render_view(&filtered, &PointDecimal, TableLayout::default()),
            "No matching expenses."
        );
    }

    #[test]
    fn test_summary_lists_months_and_dates() {
        let rows = vec![
            LedgerRow::Expense(Expense::new(parse_date("2025-01-05").unwrap(), 1000, "Food")),
            LedgerRow::Expense(Expense::new(parse_date("2025-01-05").unwrap(), 250, "Food")),
            LedgerRow::Expense(Expense::new(parse_date("2025-02-01").unwrap(), 300000, "Rent")),
        ];
        let summary = summarize(&rows).unwrap();
        let text = render_summary(&summary, &PointDecimal, TableLayout::default());

        let month_at = text.find("MONTH").unwrap();
        let date_at = text.find("DATE").unwrap();
        assert!(month_at < date_at);

        let dates: Vec<&str> = text[date_at..].lines().skip(2).take(2).collect();
        assert!(dates[0].starts_with("2025-01-05"));
        assert!(dates[0].contains("12.50"));
        assert!(dates[0].trim_end().ends_with('2'));
        assert!(dates[1].starts_with("2025-02-01"));
        assert!(dates[1].contains("3,000.00"));
        assert!(text.contains("Total: 3,012.50 (3 expenses)"));
    }
}
