//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ledgerpull_core::{IngestConfig, SequenceNumber};
use ledgerpull_sqlite::IdentifierCoverage;

#[derive(Parser)]
#[command(name = "ledgerpull", about = "Incremental ledger change ingestion")]
pub struct Cli {
    /// Ledger database path
    #[arg(
        long,
        short = 'd',
        global = true,
        env = "LEDGERPULL_DB",
        default_value = "ledger.db"
    )]
    pub db: PathBuf,

    /// How changed account ids are collected (combined | per-table)
    #[arg(long, global = true, env = "LEDGERPULL_COVERAGE", default_value = "combined")]
    pub coverage: IdentifierCoverage,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Pull one sequence per tick until interrupted, writing JSON lines to stdout
    Run(RunOpts),
    /// Pull a single sequence and exit
    Once(StartOpts),
    /// Print the highest materialized sequence
    Head,
}

#[derive(clap::Args, Default)]
pub struct StartOpts {
    /// First sequence to ingest (default: one past the store head)
    #[arg(long, env = "LEDGERPULL_START_SEQUENCE")]
    pub start_sequence: Option<SequenceNumber>,
}

impl StartOpts {
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            starting_sequence: self.start_sequence,
        }
    }
}

#[derive(clap::Args)]
pub struct RunOpts {
    #[command(flatten)]
    pub start: StartOpts,

    /// Poll interval in milliseconds
    #[arg(
        long,
        env = "LEDGERPULL_INTERVAL_MS",
        default_value = "2000",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_ms: u64,

    /// Exit on the first failed store query instead of retrying next tick
    #[arg(long)]
    pub exit_on_error: bool,
}
