use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ValidationError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger file not found: {}", .0.display())]
    FileMissing(PathBuf),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Interrupted by user")]
    InterruptedByUser,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl LedgerError {
    pub fn is_file_missing(&self) -> bool {
        matches!(self, LedgerError::FileMissing(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }
}
