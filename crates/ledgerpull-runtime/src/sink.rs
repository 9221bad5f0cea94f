//! JSON-lines output for pulled batches.

use std::io::Write;

use chrono::{DateTime, Utc};
use ledgerpull_core::{PullBatch, SequenceNumber};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct BatchLine<'a, R> {
    sequence: SequenceNumber,
    pulled_at: DateTime<Utc>,
    changed: usize,
    entities: &'a [R],
}

/// Write one batch as a single JSON line and flush.
pub fn write_batch<W, R>(out: &mut W, batch: &PullBatch<R>, pulled_at: DateTime<Utc>) -> anyhow::Result<()>
where
    W: Write,
    R: Serialize,
{
    let line = BatchLine {
        sequence: batch.sequence,
        pulled_at,
        changed: batch.changed,
        entities: &batch.records,
    };
    serde_json::to_writer(&mut *out, &line)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
