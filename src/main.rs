//! Ledger maintenance utility for the paperflow pipeline.
//!
//! The pipeline itself is embedded via [`paperflow::run`] by a process
//! that supplies the capability backends. This binary operates on the
//! processed-record ledger: inspecting it and deleting entries, which
//! is how a failed file is scheduled for reprocessing.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use paperflow::observability::init_tracing;
use paperflow::storage::ProcessedRecordStore;
use paperflow::Result;

/// paperflow ledger maintenance.
#[derive(Parser, Debug)]
#[command(name = "paperflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path of the processed-record ledger document
    #[arg(
        short,
        long,
        env = "PAPERFLOW_LEDGER",
        default_value = "./data/processed_records.json"
    )]
    ledger: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PAPERFLOW_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "PAPERFLOW_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List ledger entries with their outcomes
    List,
    /// Remove every failure entry so those files are reprocessed
    ResetFailed,
    /// Remove one entry, forcing reprocessing of that file
    Remove {
        /// Path whose entry should be removed
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    let store = ProcessedRecordStore::open(&cli.ledger)?;

    match cli.command {
        Command::List => {
            for (path, record) in store.entries() {
                let outcome = record.outcome.to_string();
                let destination = record.destination_id.as_deref().unwrap_or("-");
                println!("{outcome:<9} {destination:<20} {path}");
            }
            println!("{} entries", store.len());
        }
        Command::ResetFailed => {
            let removed = store.reset_failures()?;
            println!("removed {removed} failure entries; those files will be reprocessed");
        }
        Command::Remove { path } => {
            if store.remove(&path)? {
                println!("removed entry for {}", path.display());
            } else {
                println!("no entry for {}", path.display());
            }
        }
    }

    Ok(())
}
