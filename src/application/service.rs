use std::path::PathBuf;

use tracing::info;

use crate::domain::{
    AmountParser, Cents, DecimalSeparator, Expense, Filter, LedgerRow, MalformedRow,
    ValidationError,
};
use crate::storage::LedgerStore;

use super::{summarize, LedgerError, Summary};

/// Application service providing high-level operations for the ledger.
/// This is the handle every client (menu, one-shot commands, tests) passes
/// around; it holds no records, only where and how to read them.
pub struct LedgerService {
    store: LedgerStore,
    parser: Box<dyn AmountParser>,
}

/// A row as shown in a (possibly filtered) listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry {
    /// Position within the listing; what the user sees in the `#` column.
    pub view_index: usize,
    /// Position within the ledger file.
    pub store_index: usize,
    pub row: LedgerRow,
}

/// Result of `view`: the selected rows together with the mapping from view
/// indices back to ledger indices.
#[derive(Debug, Clone)]
pub struct FilteredView {
    pub filter: Option<Filter>,
    pub entries: Vec<ViewEntry>,
    /// Number of rows in the whole ledger.
    pub total_rows: usize,
}

impl FilteredView {
    pub fn build(rows: Vec<LedgerRow>, filter: Option<&Filter>, separator: DecimalSeparator) -> Self {
        let filter = filter.filter(|f| !f.is_empty()).cloned();
        let total_rows = rows.len();
        let entries = rows
            .into_iter()
            .enumerate()
            .filter(|(_, row)| {
                filter
                    .as_ref()
                    .is_none_or(|f| f.matches_row(row, separator))
            })
            .enumerate()
            .map(|(view_index, (store_index, row))| ViewEntry {
                view_index,
                store_index,
                row,
            })
            .collect();

        Self {
            filter,
            entries,
            total_rows,
        }
    }

    /// Map a view index to the ledger index of the same row.
    pub fn store_index(&self, view_index: usize) -> Result<usize, ValidationError> {
        self.entries
            .get(view_index)
            .map(|entry| entry.store_index)
            .ok_or(ValidationError::IndexOutOfRange {
                index: view_index,
                len: self.entries.len(),
            })
    }

    pub fn get(&self, view_index: usize) -> Result<&ViewEntry, ValidationError> {
        self.entries
            .get(view_index)
            .ok_or(ValidationError::IndexOutOfRange {
                index: view_index,
                len: self.entries.len(),
            })
    }

    pub fn rows(&self) -> impl Iterator<Item = &LedgerRow> {
        self.entries.iter().map(|entry| &entry.row)
    }

    pub fn expenses(&self) -> impl Iterator<Item = &Expense> {
        self.rows().filter_map(LedgerRow::as_expense)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &MalformedRow> {
        self.rows().filter_map(LedgerRow::as_malformed)
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of an edit.
#[derive(Debug)]
pub struct EditResult {
    pub store_index: usize,
    pub previous: LedgerRow,
    pub updated: Expense,
}

/// Outcome of a delete.
#[derive(Debug)]
pub struct DeleteResult {
    pub store_index: usize,
    pub removed: LedgerRow,
}

impl LedgerService {
    /// Create a new ledger service over the given store.
    pub fn new(store: LedgerStore) -> Self {
        let parser = store.separator().parser();
        Self { store, parser }
    }

    /// Service for the ledger file at `path`.
    pub fn open(path: impl Into<PathBuf>, separator: DecimalSeparator) -> Self {
        Self::new(LedgerStore::new(path, separator))
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn parser(&self) -> &dyn AmountParser {
        self.parser.as_ref()
    }

    pub fn separator(&self) -> DecimalSeparator {
        self.store.separator()
    }

    /// Parse a user-typed amount in the configured convention.
    pub fn parse_amount(&self, input: &str) -> Result<Cents, ValidationError> {
        self.parser
            .parse(input)
            .map_err(|e| ValidationError::from_amount(input, self.separator(), e))
    }

    /// Create the ledger file if it does not exist. Returns whether it was created.
    pub fn init(&self) -> Result<bool, LedgerError> {
        if self.store.exists() {
            return Ok(false);
        }
        self.store.create()?;
        Ok(true)
    }

    // ========================
    // Mutations
    // ========================

    /// Record a new expense. Returns its ledger index.
    pub fn add(&self, expense: Expense) -> Result<usize, LedgerError> {
        let index = self.store.append(expense)?;
        info!(index, "added expense");
        Ok(index)
    }

    /// Replace the row at `index` with `expense`.
    ///
    /// With `within`, `index` counts rows of that filtered view; without it,
    /// rows of the whole ledger.
    pub fn edit(
        &self,
        index: usize,
        within: Option<&Filter>,
        expense: Expense,
    ) -> Result<EditResult, LedgerError> {
        expense.validate()?;
        let store_index = self.resolve_index(index, within)?;
        let previous = self.store.replace_at(store_index, expense.clone())?;
        info!(store_index, "edited expense");
        Ok(EditResult {
            store_index,
            previous,
            updated: expense,
        })
    }

    /// Remove the row at `index`, with the same indexing rules as [`Self::edit`].
    pub fn delete(&self, index: usize, within: Option<&Filter>) -> Result<DeleteResult, LedgerError> {
        let store_index = self.resolve_index(index, within)?;
        let removed = self.store.remove_at(store_index)?;
        info!(store_index, "deleted expense");
        Ok(DeleteResult {
            store_index,
            removed,
        })
    }

    /// Remove the most recently appended row.
    pub fn undo_last(&self) -> Result<LedgerRow, LedgerError> {
        let removed = self.store.remove_last()?;
        info!("removed last expense");
        Ok(removed)
    }

    // ========================
    // Queries
    // ========================

    /// Load the ledger and select the rows matching `filter`.
    pub fn view(&self, filter: Option<&Filter>) -> Result<FilteredView, LedgerError> {
        let rows = self.store.load()?;
        Ok(FilteredView::build(rows, filter, self.separator()))
    }

    /// Ledger index of the row shown at `index` in the view selected by `within`.
    pub fn resolve_index(&self, index: usize, within: Option<&Filter>) -> Result<usize, LedgerError> {
        Ok(self.view(within)?.store_index(index)?)
    }

    /// The row at `index`, with the same indexing rules as [`Self::edit`].
    pub fn get(&self, index: usize, within: Option<&Filter>) -> Result<ViewEntry, LedgerError> {
        let view = self.view(within)?;
        Ok(view.get(index)?.clone())
    }

    pub fn summary(&self, filter: Option<&Filter>) -> Result<Summary, LedgerError> {
        let view = self.view(filter)?;
        Ok(summarize(view.rows())?)
    }
}
