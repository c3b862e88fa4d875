//! `colq` - encode, inspect and run collection queries.

mod commands;
mod config;
mod error;
mod formatter;
mod schema;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Args, DEFAULT_LOG_FILTER};
use error::CliError;

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(Args::parse()) {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let (config, command) = args.into_config();
    tracing::debug!(
        catalog = ?config.catalog,
        data_path = ?config.data_path,
        format = %config.format,
        with_deleted = config.with_deleted,
        "configuration loaded"
    );

    let catalog = commands::load_catalog(&config.catalog)?;
    let store = config
        .data_path
        .as_deref()
        .map(commands::load_store)
        .transpose()?;

    let formatter = formatter::create_formatter(config.format);
    let output = commands::execute(&command, &config, &catalog, store.as_ref(), &*formatter)?;
    println!("{}", output);
    Ok(())
}
