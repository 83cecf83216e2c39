//! Command-line front-end for the reading list.
//!
//! Loads the configuration, opens the book store once and hands it to the
//! requested command. Results and failures are both printed to stdout as
//! tagged JSON envelopes; the error kind decides the exit code.

mod args;
mod commands;
mod envelope;
mod error;

use crate::args::Cli;
use crate::envelope::Envelope;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use readinglist_config::Config;
use readinglist_store::Database;
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let (envelope, code) = match execute(cli).await {
        Ok(envelope) => (envelope, ExitCode::SUCCESS),
        Err(err) => {
            tracing::error!("{err:?}");
            (Envelope::Error((*err).to_string()), ExitCode::from(err.exit_code()))
        },
    };
    match print(&envelope) {
        Ok(()) => code,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::from(err.exit_code())
        },
    }
}

/// Logs go to stderr so that stdout only ever carries the envelope.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn execute(cli: Cli) -> Result<Envelope> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    // SQLite creates the database file, but not the directories leading to it.
    if let Some(parent) = config.database.parent() {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Filesystem)?;
    }
    let db = Database::connect_with_limit(&config.database, config.max_connections)
        .await
        .map_err(ErrorKind::store)?;
    let result = commands::run(cli.command, &db.books(), config.environment).await;
    db.close().await;
    result
}

fn print(envelope: &Envelope) -> Result<()> {
    let json = envelope.to_json().or_raise(|| ErrorKind::Output)?;
    std::io::stdout().lock().write_all(json.as_bytes()).or_raise(|| ErrorKind::Output)
}
