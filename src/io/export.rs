use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::info;

use crate::application::{FilteredView, LedgerError, LedgerService, Summary};
use crate::domain::ValidationError;
use crate::storage::{write_atomic, write_rows};

/// Timestamp part of export filenames: 8-digit date, underscore, 4-digit time.
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M";

pub const EXPORT_SUFFIX: &str = "_export.csv";

/// `20250925_1432_export.csv`. Always the same length.
pub fn export_file_name(at: NaiveDateTime) -> String {
    format!("{}{}", at.format(EXPORT_TIMESTAMP_FORMAT), EXPORT_SUFFIX)
}

/// Where and how much an export wrote.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub path: PathBuf,
    pub rows: usize,
}

/// Exporter for writing ledger snapshots and reports as CSV.
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Write the rows of `view` in ledger format.
    pub fn export_view_csv<W: Write>(&self, view: &FilteredView, writer: W) -> Result<usize, LedgerError> {
        let rows: Vec<_> = view.rows().cloned().collect();
        write_rows(writer, &rows, self.service.separator())?;
        Ok(rows.len())
    }

    /// Snapshot `view` into `dir` under a timestamped name. A second export
    /// within the same minute replaces the first.
    pub fn export_to_dir(
        &self,
        view: &FilteredView,
        dir: &Path,
        at: NaiveDateTime,
    ) -> Result<ExportResult, LedgerError> {
        self.export_to_file(view, &dir.join(export_file_name(at)))
    }

    /// Snapshot `view` into `path`, replacing any existing file atomically.
    pub fn export_to_file(&self, view: &FilteredView, path: &Path) -> Result<ExportResult, LedgerError> {
        if view.is_empty() {
            return Err(ValidationError::NothingToExport.into());
        }

        let mut rows = 0;
        write_atomic(path, |file| {
            rows = self.export_view_csv(view, file)?;
            Ok(())
        })?;

        info!(path = %path.display(), rows, "exported ledger snapshot");
        Ok(ExportResult {
            path: path.to_path_buf(),
            rows,
        })
    }

    /// Export per-category totals of a summary.
    pub fn export_summary_csv<W: Write>(&self, summary: &Summary, writer: W) -> Result<usize, LedgerError> {
        let parser = self.service.parser();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["category", "total", "count", "average", "percentage"])?;

        let mut count = 0;
        for category in &summary.categories {
            csv_writer.write_record([
                category.category.clone(),
                parser.format(category.total),
                category.count.to_string(),
                parser.format(category.average),
                format!("{:.1}", category.percentage),
            ])?;
            count += 1;
        }
        csv_writer.write_record([
            "TOTAL".to_string(),
            parser.format(summary.total),
            summary.count.to_string(),
            String::new(),
            String::new(),
        ])?;

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export a summary as pretty JSON.
    pub fn export_summary_json<W: Write>(&self, summary: &Summary, mut writer: W) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(summary)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
