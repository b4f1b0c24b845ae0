mod menu;
mod prompt;
mod table;

pub use menu::*;
pub use prompt::*;
pub use table::*;

use std::io::{stdout, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};

use crate::application::{show_total, FilteredView, LedgerError, LedgerService, ViewEntry};
use crate::config::Settings;
use crate::domain::{parse_date, ExpenseDraft, Filter, ValidationError};
use crate::io::Exporter;

const AMOUNT_HELP: &str = "Amounts are written with the configured decimal separator \
(default '.', e.g. 12.50; with --decimal-separator ',' write 12,50). \
Amounts using the other separator are rejected instead of guessed. \
Settings are read from expense-ledger.toml and EXPENSE_LEDGER_* variables.";

/// Expense Ledger - track expenses in a CSV file
#[derive(Parser)]
#[command(name = "expense-ledger")]
#[command(about = "Track expenses in a single CSV file")]
#[command(version)]
#[command(after_help = AMOUNT_HELP)]
pub struct Cli {
    /// Ledger CSV file (default: data/expenses.csv)
    #[arg(short, long, global = true, env = "EXPENSE_LEDGER_FILE")]
    pub file: Option<PathBuf>,

    /// Directory for export snapshots (default: data/reports)
    #[arg(long, global = true)]
    pub export_dir: Option<PathBuf>,

    /// Config file path (TOML, default: expense-ledger.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Decimal separator for amounts: "." (12.50) or "," (12,50)
    #[arg(long, global = true)]
    pub decimal_separator: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Without a command the interactive menu starts
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive menu
    Menu,

    /// Create an empty ledger file
    Init,

    /// Record an expense
    Add {
        /// Amount (e.g., "12.50")
        #[arg(allow_hyphen_values = true)]
        amount: String,

        /// Category (e.g., "Food", "Transport")
        #[arg(short, long)]
        category: String,

        /// Description of the expense
        #[arg(short, long)]
        description: Option<String>,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List expenses with their indices
    View {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Change an expense; with filter flags the index counts rows of that view
    Edit {
        /// Index as shown by `view`
        index: usize,

        #[command(flatten)]
        filter: FilterArgs,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        set_date: Option<String>,

        /// New amount
        #[arg(long)]
        set_amount: Option<String>,

        /// New category
        #[arg(long)]
        set_category: Option<String>,

        /// New description
        #[arg(long)]
        set_description: Option<String>,
    },

    /// Delete an expense; with filter flags the index counts rows of that view
    Delete {
        /// Index as shown by `view`
        index: usize,

        #[command(flatten)]
        filter: FilterArgs,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete the last expense in the file
    Undo {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Write a timestamped CSV snapshot of the (filtered) ledger
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file (timestamped file in the export directory if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Totals by category, month and date
    Summary {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Grand total
    Total {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Filter by category (case-insensitive)
    #[arg(long)]
    pub category: Option<String>,

    /// Filter from date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub from: Option<String>,

    /// Filter to date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub to: Option<String>,

    /// Search text in any field
    #[arg(long)]
    pub text: Option<String>,
}

impl FilterArgs {
    pub fn into_filter(self) -> Result<Option<Filter>, ValidationError> {
        let from = self.from.as_deref().map(parse_date).transpose()?;
        let to = self.to.as_deref().map(parse_date).transpose()?;
        let filter = Filter::new(self.category, from, to, self.text)?;
        Ok(if filter.is_empty() { None } else { Some(filter) })
    }
}

impl Cli {
    /// Settings from config file and environment, with command-line overrides.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings =
            Settings::load(self.config.as_deref()).context("Failed to load configuration")?;

        if let Some(file) = &self.file {
            settings.data_file = file.clone();
        }
        if let Some(dir) = &self.export_dir {
            settings.export_dir = dir.clone();
        }
        if let Some(sep) = &self.decimal_separator {
            settings.decimal_separator = sep.clone();
        }
        if self.verbose {
            settings.log_level = "debug".to_string();
        }
        settings.decimal_separator()?;
        Ok(settings)
    }

    pub fn run(self, settings: Settings) -> Result<()> {
        let service = LedgerService::open(&settings.data_file, settings.decimal_separator()?);
        let layout = TableLayout {
            category_width: settings.category_width,
            description_width: settings.description_width,
        };

        match self.command.unwrap_or(Commands::Menu) {
            Commands::Menu => {
                let prompt = stdin_prompt()?;
                let mut menu = Menu::new(&service, prompt, stdout())
                    .with_export_dir(&settings.export_dir)
                    .with_layout(layout);
                menu.run()?;
            }

            Commands::Init => {
                if service.init()? {
                    println!("Ledger initialized: {}", settings.data_file.display());
                } else {
                    println!("Ledger already exists: {}", settings.data_file.display());
                }
            }

            Commands::Add {
                amount,
                category,
                description,
                date,
            } => {
                let draft = ExpenseDraft {
                    date: date.unwrap_or_else(|| Local::now().date_naive().to_string()),
                    amount,
                    category,
                    description: description.unwrap_or_default(),
                };
                let expense = draft.into_expense(service.parser())?;
                let index = service.add(expense)?;
                println!("Recorded expense #{}", index);
            }

            Commands::View { filter } => {
                let filter = filter.into_filter()?;
                let view = service.view(filter.as_ref()).map_err(missing_hint)?;
                println!("{}", render_view(&view, service.parser(), layout));
            }

            Commands::Edit {
                index,
                filter,
                set_date,
                set_amount,
                set_category,
                set_description,
            } => {
                let filter = filter.into_filter()?;
                let entry = service.get(index, filter.as_ref()).map_err(missing_hint)?;

                let mut draft = ExpenseDraft::from_row(&entry.row, service.parser());
                if let Some(date) = set_date {
                    draft.date = date;
                }
                if let Some(amount) = set_amount {
                    draft.amount = amount;
                }
                if let Some(category) = set_category {
                    draft.category = category;
                }
                if let Some(description) = set_description {
                    draft.description = description;
                }

                let expense = draft.into_expense(service.parser())?;
                let result = service.edit(index, filter.as_ref(), expense)?;
                println!("Updated expense #{}", result.store_index);
            }

            Commands::Delete { index, filter, yes } => {
                let filter = filter.into_filter()?;
                let entry = service.get(index, filter.as_ref()).map_err(missing_hint)?;
                println!("{}", render_single(&service, &entry, layout));

                if !yes && !confirm(&mut stdin_prompt()?, "Delete this entry?")? {
                    println!("Nothing deleted.");
                    return Ok(());
                }
                let result = service.delete(index, filter.as_ref())?;
                println!("Deleted expense #{}", result.store_index);
            }

            Commands::Undo { yes } => {
                let view = service.view(None).map_err(missing_hint)?;
                let last = view.entries.last().ok_or(ValidationError::EmptyLedger)?;
                println!("{}", render_single(&service, last, layout));

                if !yes && !confirm(&mut stdin_prompt()?, "Delete the last entry?")? {
                    println!("Nothing deleted.");
                    return Ok(());
                }
                service.undo_last()?;
                println!("Deleted expense #{}", last.store_index);
            }

            Commands::Export { filter, output } => {
                let filter = filter.into_filter()?;
                let view = service.view(filter.as_ref()).map_err(missing_hint)?;
                let exporter = Exporter::new(&service);

                let result = match output {
                    Some(path) => exporter.export_to_file(&view, &path),
                    None => exporter.export_to_dir(
                        &view,
                        &settings.export_dir,
                        Local::now().naive_local(),
                    ),
                }?;
                eprintln!("Exported {} rows to {}", result.rows, result.path.display());
            }

            Commands::Summary { filter, format } => {
                let filter = filter.into_filter()?;
                let summary = service.summary(filter.as_ref()).map_err(missing_hint)?;
                let exporter = Exporter::new(&service);

                match format.as_str() {
                    "table" => println!("{}", render_summary(&summary, service.parser(), layout)),
                    "json" => exporter.export_summary_json(&summary, stdout())?,
                    "csv" => {
                        exporter.export_summary_csv(&summary, stdout())?;
                    }
                    _ => anyhow::bail!("Invalid format '{}'. Valid formats: table, json, csv", format),
                }
                for row in &summary.warnings {
                    eprintln!("warning: line {} skipped: {}", row.line, row.reason);
                }
            }

            Commands::Total { filter } => {
                let filter = filter.into_filter()?;
                let view = service.view(filter.as_ref()).map_err(missing_hint)?;
                println!("{}", show_total(view.rows(), service.parser())?);
            }
        }

        stdout().flush()?;
        Ok(())
    }
}

/// One entry as a table row, keeping the index the user asked for.
fn render_single(service: &LedgerService, entry: &ViewEntry, layout: TableLayout) -> String {
    let view = FilteredView {
        filter: None,
        entries: vec![entry.clone()],
        total_rows: 1,
    };
    render_view(&view, service.parser(), layout)
}

/// Handle SIGINT outside the line editor (piped input, one-shot commands)
/// with the same closing message as the menu. Ledger writes are atomic, so
/// exiting mid-command never leaves a partial file.
pub fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        let _ = write_interrupted(&mut stdout());
        std::process::exit(0);
    })
    .context("Failed to install Ctrl-C handler")
}

fn missing_hint(err: LedgerError) -> anyhow::Error {
    match err {
        LedgerError::FileMissing(path) => anyhow::anyhow!(
            "Ledger file not found: {}. Run `expense-ledger init` or add an expense to create it.",
            path.display()
        ),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DecimalSeparator, Expense, LedgerRow};
    use clap::CommandFactory;
    use std::ffi::OsStr;

    #[test]
    fn test_file_flag_reads_environment() {
        let command = Cli::command();
        let file = command
            .get_arguments()
            .find(|arg| arg.get_id() == "file")
            .unwrap();
        assert_eq!(file.get_env(), Some(OsStr::new("EXPENSE_LEDGER_FILE")));

        let cli = Cli::try_parse_from(["expense-ledger", "-f", "books.csv", "total"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("books.csv")));
    }

    #[test]
    fn test_interrupt_message() {
        let mut out = Vec::new();
        write_interrupted(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("\n{}\n", INTERRUPTED));
    }

    #[test]
    fn test_render_single_keeps_index_and_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = LedgerService::open(dir.path().join("expenses.csv"), DecimalSeparator::Point);
        let entry = ViewEntry {
            view_index: 3,
            store_index: 7,
            row: LedgerRow::Expense(
                Expense::new(parse_date("2025-01-01").unwrap(), 1250, "Groceries")
                    .with_description("A very long description"),
            ),
        };
        let layout = TableLayout {
            category_width: 8,
            description_width: 10,
        };

        let table = render_single(&service, &entry, layout);
        let row = table.lines().nth(2).unwrap();
        assert!(row.starts_with("3  2025-01-01"));
        assert!(row.contains("Groceri…"));
        // Never narrower than the DESCRIPTION header.
        assert!(row.ends_with("A very lon…"));
    }
}
