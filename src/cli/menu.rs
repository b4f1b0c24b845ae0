use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};

use crate::application::{show_total, LedgerError, LedgerService};
use crate::domain::{parse_date, ExpenseDraft, Filter, LedgerRow, ValidationError, DATE_FORMAT};
use crate::io::Exporter;

use super::prompt::{ask_with_default, confirm, Prompt};
use super::table::{render_summary, render_view, TableLayout};

pub const GOODBYE: &str = "Goodbye!";
pub const INTERRUPTED: &str = "Interrupted. Ledger saved, goodbye!";

/// Closing message after Ctrl-C, on its own line.
pub fn write_interrupted<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\n{}", INTERRUPTED)?;
    out.flush()
}

/// Whether the menu loop should keep going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive read-evaluate-print loop over a ledger.
///
/// The only state carried between commands is the active view filter; rows
/// are re-read from the file by every command.
pub struct Menu<'a, P, W> {
    service: &'a LedgerService,
    prompt: P,
    out: W,
    export_dir: PathBuf,
    layout: TableLayout,
    filter: Option<Filter>,
}

impl<'a, P: Prompt, W: Write> Menu<'a, P, W> {
    pub fn new(service: &'a LedgerService, prompt: P, out: W) -> Self {
        Self {
            service,
            prompt,
            out,
            export_dir: PathBuf::from("data/reports"),
            layout: TableLayout::default(),
            filter: None,
        }
    }

    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn with_layout(mut self, layout: TableLayout) -> Self {
        self.layout = layout;
        self
    }

    /// The filter that view-relative indices currently refer to.
    pub fn active_filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until `quit`, end of input or Ctrl-C.
    pub fn run(&mut self) -> Result<(), LedgerError> {
        writeln!(
            self.out,
            "Expense ledger: {} (amounts use '{}' as decimal separator). Type 'help' for commands.",
            self.service.store().path().display(),
            self.service.separator()
        )?;
        if !self.service.store().exists() {
            writeln!(
                self.out,
                "No ledger file yet; it will be created on the first 'add'."
            )?;
        }

        loop {
            let line = match self.prompt.read_line("> ") {
                Ok(Some(line)) => line,
                Ok(None) => {
                    writeln!(self.out, "{}", GOODBYE)?;
                    return Ok(());
                }
                Err(LedgerError::InterruptedByUser) => {
                    write_interrupted(&mut self.out)?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            match self.execute(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => {
                    writeln!(self.out, "{}", GOODBYE)?;
                    return Ok(());
                }
                Err(LedgerError::InterruptedByUser) => {
                    write_interrupted(&mut self.out)?;
                    return Ok(());
                }
                Err(LedgerError::FileMissing(path)) => {
                    if self.offer_recreate(&path)? == Flow::Quit {
                        write_interrupted(&mut self.out)?;
                        return Ok(());
                    }
                }
                Err(LedgerError::Validation(e)) => {
                    writeln!(self.out, "Error: {}", e)?;
                }
                Err(e) => {
                    warn!(error = %e, "command failed");
                    writeln!(self.out, "Error: {}", e)?;
                }
            }
        }
    }

    /// Execute a single menu command line.
    pub fn execute(&mut self, line: &str) -> Result<Flow, LedgerError> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = words.collect();
        debug!(command, ?args, "menu command");

        match command.to_lowercase().as_str() {
            "add" | "a" => self.add()?,
            "edit" | "e" => self.edit(&args)?,
            "delete" | "del" | "rm" => self.delete(&args)?,
            "undo" => self.undo()?,
            "view" | "v" | "list" | "ls" => self.view(&args)?,
            "export" => self.export()?,
            "summary" | "s" => self.summary()?,
            "total" | "t" => self.total()?,
            "help" | "h" | "?" => self.help()?,
            "quit" | "exit" | "q" => return Ok(Flow::Quit),
            other => writeln!(
                self.out,
                "Unknown command '{}'. Type 'help' for the list of commands.",
                other
            )?,
        }
        Ok(Flow::Continue)
    }

    fn offer_recreate(&mut self, path: &Path) -> Result<Flow, LedgerError> {
        writeln!(self.out, "Ledger file {} is missing.", path.display())?;
        match confirm(&mut self.prompt, "Create an empty ledger?") {
            Ok(true) => {
                self.service.init()?;
                writeln!(self.out, "Created {}.", path.display())?;
            }
            Ok(false) => writeln!(self.out, "Command aborted.")?,
            Err(LedgerError::InterruptedByUser) => return Ok(Flow::Quit),
            Err(e) => return Err(e),
        }
        Ok(Flow::Continue)
    }

    fn add(&mut self) -> Result<(), LedgerError> {
        let today = Local::now().date_naive().format(DATE_FORMAT).to_string();
        let Some(draft) = self.ask_expense(ExpenseDraft {
            date: today,
            ..ExpenseDraft::default()
        })?
        else {
            return Ok(());
        };

        let expense = draft.into_expense(self.service.parser())?;
        let index = self.service.add(expense)?;
        writeln!(self.out, "Saved as #{}.", index)?;
        Ok(())
    }

    fn edit(&mut self, args: &[&str]) -> Result<(), LedgerError> {
        let Some(index) = self.index_arg(args, "edit")? else {
            return Ok(());
        };
        let filter = self.filter.clone();
        let entry = self.service.get(index, filter.as_ref())?;
        if let LedgerRow::Malformed(row) = &entry.row {
            writeln!(self.out, "This row is malformed ({}); enter corrected values.", row.reason)?;
        }

        let current = ExpenseDraft::from_row(&entry.row, self.service.parser());
        let Some(draft) = self.ask_expense(current)? else {
            return Ok(());
        };

        let expense = draft.into_expense(self.service.parser())?;
        let result = self.service.edit(index, filter.as_ref(), expense)?;
        writeln!(self.out, "Updated #{}.", result.store_index)?;
        Ok(())
    }

    fn delete(&mut self, args: &[&str]) -> Result<(), LedgerError> {
        let Some(index) = self.index_arg(args, "delete")? else {
            return Ok(());
        };
        let filter = self.filter.clone();
        let entry = self.service.get(index, filter.as_ref())?;

        writeln!(self.out, "{}", describe(self.service, &entry.row))?;
        if filter.is_some() {
            writeln!(
                self.out,
                "(row {} of the filtered view, row {} of the ledger)",
                index, entry.store_index
            )?;
        }
        if !confirm(&mut self.prompt, "Delete this entry?")? {
            writeln!(self.out, "Nothing deleted.")?;
            return Ok(());
        }

        let result = self.service.delete(index, filter.as_ref())?;
        writeln!(self.out, "Deleted: {}", describe(self.service, &result.removed))?;
        Ok(())
    }

    fn undo(&mut self) -> Result<(), LedgerError> {
        let view = self.service.view(None)?;
        let Some(last) = view.entries.last() else {
            return Err(ValidationError::EmptyLedger.into());
        };
        writeln!(self.out, "{}", describe(self.service, &last.row))?;
        if !confirm(&mut self.prompt, "Delete the last entry?")? {
            writeln!(self.out, "Nothing deleted.")?;
            return Ok(());
        }
        let removed = self.service.undo_last()?;
        writeln!(self.out, "Deleted: {}", describe(self.service, &removed))?;
        Ok(())
    }

    fn view(&mut self, args: &[&str]) -> Result<(), LedgerError> {
        let filter = Filter::parse_terms(args.iter().copied())?;
        self.filter = if filter.is_empty() { None } else { Some(filter) };

        let view = self.service.view(self.filter.as_ref())?;
        writeln!(
            self.out,
            "{}",
            render_view(&view, self.service.parser(), self.layout)
        )?;
        if let Some(filter) = &view.filter {
            writeln!(
                self.out,
                "Filter: {} ({} of {} rows). Indices refer to this view; 'view' alone clears it.",
                filter,
                view.len(),
                view.total_rows
            )?;
        }
        Ok(())
    }

    fn export(&mut self) -> Result<(), LedgerError> {
        let view = self.service.view(self.filter.as_ref())?;
        let exporter = Exporter::new(self.service);
        let result = exporter.export_to_dir(&view, &self.export_dir, Local::now().naive_local())?;
        writeln!(
            self.out,
            "Exported {} rows to {}",
            result.rows,
            result.path.display()
        )?;
        Ok(())
    }

    fn summary(&mut self) -> Result<(), LedgerError> {
        let summary = self.service.summary(self.filter.as_ref())?;
        writeln!(
            self.out,
            "{}",
            render_summary(&summary, self.service.parser(), self.layout)
        )?;
        Ok(())
    }

    fn total(&mut self) -> Result<(), LedgerError> {
        let view = self.service.view(self.filter.as_ref())?;
        writeln!(self.out, "{}", show_total(view.rows(), self.service.parser())?)?;
        Ok(())
    }

    fn help(&mut self) -> Result<(), LedgerError> {
        let sep = self.service.separator();
        writeln!(
            self.out,
            "Commands:
  add                 record a new expense
  edit <#>            change the entry shown as # in the current view
  delete <#>          delete the entry shown as # in the current view
  undo                delete the last entry in the file
  view [filters]      list entries; filters: category=NAME from=YYYY-MM-DD
                      to=YYYY-MM-DD text=WORD (bare words search all fields)
  export              write the current view to {}
  summary             totals by category, month and date for the view
  total               grand total for the current view
  quit                leave (Ctrl-C and Ctrl-D work too)

Amounts use '{}' as decimal separator, e.g. 12{}50. Dates are YYYY-MM-DD.",
            self.export_dir.display(),
            sep,
            sep
        )?;
        Ok(())
    }

    /// Index from the command arguments, or asked for after showing the view.
    fn index_arg(&mut self, args: &[&str], action: &str) -> Result<Option<usize>, LedgerError> {
        let raw = match args.first() {
            Some(raw) => raw.to_string(),
            None => {
                let view = self.service.view(self.filter.as_ref())?;
                writeln!(
                    self.out,
                    "{}",
                    render_view(&view, self.service.parser(), self.layout)
                )?;
                if view.is_empty() {
                    return Ok(None);
                }
                match self.prompt.read_line(&format!("Enter index (#) to {}: ", action))? {
                    Some(raw) => raw,
                    None => return Ok(None),
                }
            }
        };

        match raw.trim().parse::<usize>() {
            Ok(index) => Ok(Some(index)),
            Err(_) => {
                writeln!(self.out, "Please enter a row number from the '#' column.")?;
                Ok(None)
            }
        }
    }

    /// Ask for each field, re-asking until it parses. `None` at end of input.
    fn ask_expense(&mut self, current: ExpenseDraft) -> Result<Option<ExpenseDraft>, LedgerError> {
        let service = self.service;

        let date = loop {
            let Some(date) = ask_with_default(&mut self.prompt, "Date (YYYY-MM-DD)", &current.date)?
            else {
                return Ok(None);
            };
            match parse_date(&date) {
                Ok(_) => break date,
                Err(e) => writeln!(self.out, "{}", e)?,
            }
        };

        let amount = loop {
            let Some(amount) = ask_with_default(&mut self.prompt, "Amount", &current.amount)? else {
                return Ok(None);
            };
            match service.parse_amount(&amount) {
                Ok(cents) => break service.parser().format(cents),
                Err(e) => writeln!(self.out, "{}", e)?,
            }
        };

        let Some(category) = ask_with_default(&mut self.prompt, "Category", &current.category)?
        else {
            return Ok(None);
        };
        let Some(description) =
            ask_with_default(&mut self.prompt, "Description", &current.description)?
        else {
            return Ok(None);
        };

        Ok(Some(ExpenseDraft {
            date,
            amount,
            category,
            description,
        }))
    }
}

fn describe(service: &LedgerService, row: &LedgerRow) -> String {
    match row {
        LedgerRow::Expense(expense) => format!(
            "{} {} {} {}",
            expense.date.format(DATE_FORMAT),
            service.parser().format(expense.amount),
            expense.category,
            expense.description
        )
        .trim_end()
        .to_string(),
        LedgerRow::Malformed(row) => {
            format!("{} (malformed: {})", row.fields.join(","), row.reason)
        }
    }
}
