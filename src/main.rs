use anyhow::Result;
use clap::Parser;
use expense_ledger::cli::{install_interrupt_handler, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("expense_ledger={}", settings.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    install_interrupt_handler()?;
    cli.run(settings)
}
