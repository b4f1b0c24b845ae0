use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::application::LedgerError;
use crate::domain::{DecimalSeparator, ValidationError};

pub const DEFAULT_CONFIG_PATH: &str = "expense-ledger.toml";
pub const ENV_PREFIX: &str = "EXPENSE_LEDGER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ledger CSV file.
    pub data_file: PathBuf,
    /// Directory receiving export snapshots.
    pub export_dir: PathBuf,
    /// "." or ",". Applies to typed amounts and to the amount column on disk.
    pub decimal_separator: String,
    /// Widest the category column may grow before truncation.
    pub category_width: usize,
    /// Widest the description column may grow before truncation.
    pub description_width: usize,
    /// tracing level for this crate when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/expenses.csv"),
            export_dir: PathBuf::from("data/reports"),
            decimal_separator: ".".to_string(),
            category_width: 16,
            description_width: 32,
            log_level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Layer defaults, the TOML file and `EXPENSE_LEDGER_*` variables.
    ///
    /// An explicit `config_path` must exist; the default one is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self, LedgerError> {
        let (path, required) = match config_path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(config::File::from(path).required(required))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        settings.decimal_separator()?;
        Ok(settings)
    }

    pub fn decimal_separator(&self) -> Result<DecimalSeparator, ValidationError> {
        self.decimal_separator.parse()
    }
}
