// Application layer - use cases over the ledger file.
// Clients (the menu, one-shot commands, tests) go through LedgerService;
// only the storage layer touches the CSV file.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
