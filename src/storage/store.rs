use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::mem;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::application::LedgerError;
use crate::domain::{
    format_amount, parse_amount, parse_date, DecimalSeparator, Expense, LedgerRow,
    MalformedRow, ValidationError, DATE_FORMAT, HEADERS,
};

/// The ledger file. Every operation reads the file fresh; nothing is cached
/// between calls, so edits made outside the program are always picked up.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
    separator: DecimalSeparator,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>, separator: DecimalSeparator) -> Self {
        Self {
            path: path.into(),
            separator,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn separator(&self) -> DecimalSeparator {
        self.separator
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write an empty ledger (header only), creating parent directories.
    pub fn create(&self) -> Result<(), LedgerError> {
        info!(path = %self.path.display(), "creating ledger file");
        self.save(&[])
    }

    /// Read every row of the ledger.
    ///
    /// Fails with [`LedgerError::FileMissing`] if the file is gone, even if it
    /// existed when the program started.
    pub fn load(&self) -> Result<Vec<LedgerRow>, LedgerError> {
        if !self.exists() {
            return Err(LedgerError::FileMissing(self.path.clone()));
        }
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LedgerError::FileMissing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let rows = read_rows(file, self.separator)?;
        debug!(path = %self.path.display(), rows = rows.len(), "loaded ledger");
        Ok(rows)
    }

    /// Replace the whole ledger with `rows`.
    pub fn save(&self, rows: &[LedgerRow]) -> Result<(), LedgerError> {
        write_atomic(&self.path, |file| write_rows(file, rows, self.separator))
    }

    /// Add an expense at the end, recreating the file if it went missing.
    /// Returns the index of the new row.
    pub fn append(&self, expense: Expense) -> Result<usize, LedgerError> {
        expense.validate()?;
        let mut rows = match self.load() {
            Ok(rows) => rows,
            Err(LedgerError::FileMissing(path)) => {
                warn!(path = %path.display(), "ledger file missing, recreating it");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        rows.push(LedgerRow::Expense(expense));
        self.save(&rows)?;
        Ok(rows.len() - 1)
    }

    /// Overwrite the row at `index`, returning the previous row.
    pub fn replace_at(&self, index: usize, expense: Expense) -> Result<LedgerRow, LedgerError> {
        expense.validate()?;
        let mut rows = self.load()?;
        check_index(index, rows.len())?;
        let previous = mem::replace(&mut rows[index], LedgerRow::Expense(expense));
        self.save(&rows)?;
        Ok(previous)
    }

    /// Remove the row at `index`, returning it.
    pub fn remove_at(&self, index: usize) -> Result<LedgerRow, LedgerError> {
        let mut rows = self.load()?;
        check_index(index, rows.len())?;
        let removed = rows.remove(index);
        self.save(&rows)?;
        Ok(removed)
    }

    /// Remove the last row (undo of the latest add).
    pub fn remove_last(&self) -> Result<LedgerRow, LedgerError> {
        let mut rows = self.load()?;
        let removed = rows.pop().ok_or(ValidationError::EmptyLedger)?;
        self.save(&rows)?;
        Ok(removed)
    }
}

fn check_index(index: usize, len: usize) -> Result<(), ValidationError> {
    if index >= len {
        return Err(ValidationError::IndexOutOfRange { index, len });
    }
    Ok(())
}

/// Parse ledger CSV. Lines that are not valid expenses become
/// [`LedgerRow::Malformed`] with their fields preserved.
pub fn read_rows<R: Read>(reader: R, separator: DecimalSeparator) -> Result<Vec<LedgerRow>, LedgerError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (i, result) in csv_reader.byte_records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(i + 1);

        let utf8 = std::str::from_utf8(record.as_slice()).is_ok();
        let fields: Vec<String> = record
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();

        if i == 0 && is_header(&fields) {
            continue;
        }

        let row = if utf8 {
            parse_row(line, fields, separator)
        } else {
            malformed(line, fields, "invalid UTF-8".to_string())
        };
        rows.push(row);
    }
    Ok(rows)
}

fn is_header(fields: &[String]) -> bool {
    fields.len() == HEADERS.len()
        && fields
            .iter()
            .zip(HEADERS)
            .all(|(field, header)| field.trim().eq_ignore_ascii_case(header))
}

fn parse_row(line: usize, fields: Vec<String>, separator: DecimalSeparator) -> LedgerRow {
    if fields.len() != HEADERS.len() {
        let reason = format!("expected {} columns, found {}", HEADERS.len(), fields.len());
        return malformed(line, fields, reason);
    }

    let date = match parse_date(&fields[0]) {
        Ok(date) => date,
        Err(_) => {
            let reason = format!("invalid date '{}'", fields[0]);
            return malformed(line, fields, reason);
        }
    };
    let amount = match parse_amount(&fields[1], separator) {
        Ok(amount) => amount,
        Err(e) => {
            let reason = format!("non-numeric amount '{}' ({})", fields[1], e);
            return malformed(line, fields, reason);
        }
    };
    if fields[2].trim().is_empty() {
        return malformed(line, fields, "empty category".to_string());
    }

    LedgerRow::Expense(Expense::new(date, amount, fields[2].as_str()).with_description(fields[3].as_str()))
}

fn malformed(line: usize, fields: Vec<String>, reason: String) -> LedgerRow {
    debug!(line, %reason, "malformed ledger row");
    LedgerRow::Malformed(MalformedRow {
        line,
        fields,
        reason,
    })
}

/// Write the header and `rows` as ledger CSV.
pub fn write_rows<W: Write>(writer: W, rows: &[LedgerRow], separator: DecimalSeparator) -> Result<(), LedgerError> {
    let mut csv_writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    csv_writer.write_record(HEADERS)?;

    for row in rows {
        match row {
            LedgerRow::Expense(expense) => csv_writer.write_record([
                expense.date.format(DATE_FORMAT).to_string(),
                format_amount(expense.amount, separator),
                expense.category.clone(),
                expense.description.clone(),
            ])?,
            LedgerRow::Malformed(row) => csv_writer.write_record(&row.fields)?,
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write `path` through a temporary file in the same directory, then move it
/// into place. Readers see either the old or the new content, never a prefix.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), LedgerError>
where
    F: FnOnce(&mut NamedTempFile) -> Result<(), LedgerError>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    write(&mut tmp)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| LedgerError::Io(e.error))?;

    debug!(path = %path.display(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> LedgerStore {
        LedgerStore::new(dir.path().join("expenses.csv"), DecimalSeparator::Point)
    }

    #[test]
    fn test_read_skips_header_case_insensitively() {
        let data = "date,AMOUNT,Category,description\n2025-01-01,12.5,Food,lunch\n";
        let rows = read_rows(data.as_bytes(), DecimalSeparator::Point).unwrap();
        assert_eq!(rows.len(), 1);
        let expense = rows[0].as_expense().unwrap();
        assert_eq!(expense.amount, 1250);
        assert_eq!(expense.category, "Food");
    }

    #[test]
    fn test_read_without_header() {
        let data = "2025-01-01,3,Food,\n";
        let rows = read_rows(data.as_bytes(), DecimalSeparator::Point).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_expense().unwrap().amount, 300);
    }

    #[test]
    fn test_read_marks_malformed_rows() {
        let data = "Date,Amount,Category,Description\n\
                    2025-01-01,abc,Food,lunch\n\
                    2025-13-01,1.00,Food,bad date\n\
                    2025-01-02,2.00,,no category\n\
                    2025-01-03,3.00,Food\n\
                    2025-01-04,4.00,Food,ok\n";
        let rows = read_rows(data.as_bytes(), DecimalSeparator::Point).unwrap();
        assert_eq!(rows.len(), 5);

        let malformed: Vec<&MalformedRow> = rows.iter().filter_map(LedgerRow::as_malformed).collect();
        assert_eq!(malformed.len(), 4);
        assert_eq!(malformed[0].line, 2);
        assert!(malformed[0].reason.contains("non-numeric amount"));
        assert!(malformed[1].reason.contains("invalid date"));
        assert_eq!(malformed[2].reason, "empty category");
        assert!(malformed[3].reason.contains("columns"));
        assert!(!rows[4].is_malformed());
    }

    #[test]
    fn test_comma_locale_amounts_are_quoted() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::new(dir.path().join("expenses.csv"), DecimalSeparator::Comma);
        let date = parse_date("2025-01-01").unwrap();
        store.append(Expense::new(date, 1250, "Food")).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\"12,50\""));
        assert_eq!(store.load().unwrap()[0].as_expense().unwrap().amount, 1250);
    }

    #[test]
    fn test_save_preserves_malformed_rows() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(
            store.path(),
            "Date,Amount,Category,Description\n2025-01-01,12;50,Food,odd\n",
        )
        .unwrap();

        store
            .append(Expense::new(parse_date("2025-01-02").unwrap(), 100, "Food"))
            .unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("2025-01-01,12;50,Food,odd"));
        let rows = store.load().unwrap();
        assert!(rows[0].is_malformed());
        assert!(!rows[1].is_malformed());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = store(&dir).load();
        assert!(matches!(result, Err(LedgerError::FileMissing(_))));
    }

    #[test]
    fn test_create_makes_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::new(
            dir.path().join("data").join("expenses.csv"),
            DecimalSeparator::Point,
        );
        store.create().unwrap();
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "Date,Amount,Category,Description\n"
        );
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.create().unwrap();
        store
            .append(Expense::new(parse_date("2025-01-02").unwrap(), 100, "Food"))
            .unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_failed_write_keeps_previous_content() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.create().unwrap();
        let before = fs::read(store.path()).unwrap();

        let result = write_atomic(store.path(), |file| {
            file.write_all(b"partial")?;
            Err(LedgerError::InterruptedByUser)
        });

        assert!(result.is_err());
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_remove_last_on_empty_ledger() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.create().unwrap();
        assert!(matches!(
            store.remove_last(),
            Err(LedgerError::Validation(ValidationError::EmptyLedger))
        ));
    }
}
