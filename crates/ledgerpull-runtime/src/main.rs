//! ledgerpull: incremental ingestion of ledger changes from a ledger node's
//! SQLite database, emitted as JSON lines on stdout.

use anyhow::Context;
use clap::Parser;
use ledgerpull_core::{LedgerGateway, PullDriver};
use ledgerpull_sqlite::{LedgerStore, SqliteGateway};

mod cli;
mod poll_loop;
mod sink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("LEDGERPULL_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let db = args.db.clone();
    let coverage = args.coverage;
    let gateway = tokio::task::spawn_blocking(move || {
        LedgerStore::open_existing(&db)
            .map(|store| SqliteGateway::new(store, coverage))
            .with_context(|| format!("opening ledger database {}", db.display()))
    })
    .await??;

    tracing::debug!("opened {} ({} coverage)", args.db.display(), coverage.as_str());

    match args.command {
        cli::Command::Run(opts) => poll_loop::run_ingest(gateway, opts).await?,
        cli::Command::Once(opts) => {
            let config = opts.ingest_config();
            tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
                let mut driver = PullDriver::new(gateway, config)?;
                let start = driver.current_sequence();
                match driver.pull_batch()? {
                    Some(batch) => {
                        sink::write_batch(&mut std::io::stdout(), &batch, chrono::Utc::now())?
                    }
                    None => tracing::info!(
                        "sequence {start} not available; cursor now at {}",
                        driver.current_sequence()
                    ),
                }
                let stats = serde_json::to_string(&driver.stats())?;
                tracing::info!("stats {stats}");
                Ok(())
            })
            .await??;
        }
        cli::Command::Head => {
            let head = tokio::task::spawn_blocking(move || gateway.max_known_sequence()).await??;
            println!("{head}");
        }
    }

    Ok(())
}
