//! Poll loop: drives the pull driver at a fixed interval until shutdown.
//! Pulls run on the blocking pool; the driver is moved in and handed back,
//! so only one pull is ever in flight.

use std::io::Write;

use chrono::Utc;
use serde::Serialize;
use tokio::time::{Duration, MissedTickBehavior, interval};

use ledgerpull_core::{IngestError, LedgerGateway, PullBatch, PullDriver};
use ledgerpull_sqlite::SqliteGateway;

use crate::cli::RunOpts;
use crate::sink;

type TickOutcome<G> = (
    PullDriver<G>,
    Result<Option<PullBatch<<G as LedgerGateway>::Record>>, IngestError>,
);

/// Run ingestion until ctrl-c/SIGTERM, or until the first failed pull when
/// `--exit-on-error` is set.
pub async fn run_ingest(gateway: SqliteGateway, opts: RunOpts) -> anyhow::Result<()> {
    let config = opts.start.ingest_config();
    let driver =
        tokio::task::spawn_blocking(move || PullDriver::new(gateway, config)).await??;

    tracing::info!(
        "ingest starting at sequence {} (interval {}ms)",
        driver.current_sequence(),
        opts.interval_ms
    );

    let mut stdout = std::io::stdout();
    let poll = run_poll_loop(driver, opts.interval_ms, opts.exit_on_error, &mut stdout);

    tokio::select! {
        res = shutdown_signal() => res?,
        res = poll => res?,
    }

    tracing::info!("ingest stopped");
    Ok(())
}

async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            res = ctrl_c => {
                res?;
                tracing::info!("received ctrl-c, shutting down");
            }
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await?;
        tracing::info!("received ctrl-c, shutting down");
    }

    Ok(())
}

/// Pull once per tick, writing each processed batch that produced entities.
/// Returns only on a write failure or, with `exit_on_error`, a failed pull.
async fn run_poll_loop<G, W>(
    mut driver: PullDriver<G>,
    poll_ms: u64,
    exit_on_error: bool,
    out: &mut W,
) -> anyhow::Result<()>
where
    G: LedgerGateway + Send + 'static,
    G::Record: Serialize + Send + 'static,
    W: Write,
{
    anyhow::ensure!(poll_ms > 0, "poll interval must be at least 1ms");
    let mut ticker = interval(Duration::from_millis(poll_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let (returned, result) = pull_tick(driver).await?;
        driver = returned;

        match result {
            Ok(Some(batch)) if !batch.records.is_empty() => {
                sink::write_batch(out, &batch, Utc::now())?;
            }
            Ok(_) => {}
            Err(e) if exit_on_error => {
                let stats = serde_json::to_string(&driver.stats())?;
                tracing::error!(
                    "pull failed at sequence {}: {e}; stats {stats}",
                    driver.current_sequence()
                );
                return Err(e.into());
            }
            Err(e) => {
                tracing::warn!(
                    "pull failed at sequence {}, retrying next tick: {e}",
                    driver.current_sequence()
                );
            }
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            let stats = serde_json::to_string(&driver.stats())?;
            tracing::debug!("tick done, stats {stats}");
        }
    }
}

/// Run one blocking pull and hand the driver back.
async fn pull_tick<G>(mut driver: PullDriver<G>) -> anyhow::Result<TickOutcome<G>>
where
    G: LedgerGateway + Send + 'static,
    G::Record: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || {
        let result = driver.pull_batch();
        (driver, result)
    })
    .await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerpull_core::{IngestConfig, SequenceNumber, StoreQuery};
    use ledgerpull_sqlite::{AccountEntry, IdentifierCoverage, LedgerStore};

    fn close(store: &LedgerStore, seq: u64, ids: &[&str]) {
        let seq = SequenceNumber::new(seq);
        store.insert_ledger_header(seq, "hash", 0).unwrap();
        for id in ids {
            store
                .upsert_account(&AccountEntry {
                    account_id: id.to_string(),
                    balance: 1,
                    seq_num: 1,
                    num_subentries: 0,
                    home_domain: String::new(),
                    flags: 0,
                    last_modified: seq,
                })
                .unwrap();
        }
    }

    fn driver(store: LedgerStore, start: u64) -> PullDriver<SqliteGateway> {
        let gateway = SqliteGateway::new(store, IdentifierCoverage::Combined);
        PullDriver::new(gateway, IngestConfig::new().with_starting_sequence(start)).unwrap()
    }

    #[tokio::test]
    async fn pull_tick_returns_driver_after_advancing() {
        let store = LedgerStore::open_in_memory().unwrap();
        close(&store, 5, &["GA"]);
        let driver = driver(store, 5);

        let (driver, result) = pull_tick(driver).await.unwrap();
        let batch = result.unwrap().expect("sequence 5 processed");

        assert_eq!(batch.sequence, SequenceNumber::new(5));
        assert_eq!(batch.records.len(), 1);
        assert_eq!(driver.current_sequence(), SequenceNumber::new(6));
    }

    #[tokio::test]
    async fn loop_writes_lines_only_for_batches_with_entities() {
        let store = LedgerStore::open_in_memory().unwrap();
        close(&store, 5, &["GA", "GB"]);
        close(&store, 6, &[]);
        close(&store, 7, &["GC"]);
        let driver = driver(store, 5);
        let mut out = Vec::new();

        let res = tokio::time::timeout(
            Duration::from_millis(300),
            run_poll_loop(driver, 5, false, &mut out),
        )
        .await;
        assert!(res.is_err(), "loop runs until cancelled");

        let text = String::from_utf8(out).unwrap();
        let sequences: Vec<u64> = text
            .lines()
            .map(|line| {
                let v: serde_json::Value = serde_json::from_str(line).unwrap();
                v["sequence"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(sequences, vec![5, 7]);
    }

    #[tokio::test]
    async fn zero_interval_is_an_error() {
        let store = LedgerStore::open_in_memory().unwrap();
        close(&store, 5, &["GA"]);
        let mut out = Vec::new();

        let err = run_poll_loop(driver(store, 5), 0, false, &mut out)
            .await
            .expect_err("zero period must be rejected");
        assert!(err.to_string().contains("at least 1ms"));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn exit_on_error_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let store = LedgerStore::open(&path).unwrap();
        close(&store, 5, &[]);
        let driver = driver(store, 5);

        let other = rusqlite::Connection::open(&path).unwrap();
        other.execute_batch("DROP TABLE trustlines;").unwrap();

        let mut out = Vec::new();
        let err = run_poll_loop(driver, 5, true, &mut out)
            .await
            .expect_err("broken store should stop the loop");
        let ingest = err.downcast_ref::<IngestError>().expect("ingest error");
        assert_eq!(ingest.query(), StoreQuery::ChangedIdentifiers);
        assert!(out.is_empty());
    }
}
