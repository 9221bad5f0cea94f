//! Pull driver: one call, at most one sequence.
//!
//! Each [`PullDriver::pull`] either fast-forwards/waits without processing
//! anything, or processes exactly the current sequence and advances by one.
//! A failed store query leaves the cursor untouched and returns no records.

use serde::Serialize;
use tracing::debug;

use crate::assembler::ChangeSetAssembler;
use crate::config::IngestConfig;
use crate::cursor::{CursorCheck, SequenceCursor};
use crate::error::{IngestError, Result, StoreQuery};
use crate::gateway::LedgerGateway;
use crate::types::SequenceNumber;

// ─── Batch & Stats ───────────────────────────────────────────────

/// Records materialized for one processed sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullBatch<R> {
    pub sequence: SequenceNumber,
    /// Unique identifiers that changed at `sequence`.
    pub changed: usize,
    pub records: Vec<R>,
}

/// Process-local counters. Diagnostic only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullStats {
    pub sequences_processed: u64,
    pub fast_forwards: u64,
    pub stalls: u64,
    pub entities_emitted: u64,
}

// ─── Driver ──────────────────────────────────────────────────────

pub struct PullDriver<G> {
    gateway: G,
    cursor: SequenceCursor,
    assembler: ChangeSetAssembler,
    stats: PullStats,
}

impl<G: LedgerGateway> PullDriver<G> {
    /// Build a driver, resolving the starting sequence from `config` or the
    /// store's current head.
    pub fn new(gateway: G, config: IngestConfig) -> Result<Self> {
        let cursor = SequenceCursor::initialize(&gateway, &config)?;
        Ok(Self::with_cursor(gateway, cursor))
    }

    pub fn with_cursor(gateway: G, cursor: SequenceCursor) -> Self {
        Self {
            gateway,
            cursor,
            assembler: ChangeSetAssembler::new(),
            stats: PullStats::default(),
        }
    }

    /// Ingest the current sequence, returning its records. Empty when the
    /// sequence was missing (fast-forward or stall) or changed nothing.
    pub fn pull(&mut self) -> Result<Vec<G::Record>> {
        Ok(self
            .pull_batch()?
            .map(|batch| batch.records)
            .unwrap_or_default())
    }

    /// Like [`pull`](Self::pull), but reports which sequence was processed.
    /// `None` means no sequence was processed this call.
    pub fn pull_batch(&mut self) -> Result<Option<PullBatch<G::Record>>> {
        let sequence = self.cursor.current_sequence();
        debug!("ingesting sequence {sequence}");

        match self.cursor.check_advanceable(&self.gateway)? {
            CursorCheck::Ready => {}
            check @ CursorCheck::FastForwarded { .. } => {
                if check.skipped_gap() {
                    self.stats.fast_forwards += 1;
                } else {
                    self.stats.stalls += 1;
                }
                return Ok(None);
            }
        }

        let changes = self
            .assembler
            .resolve_changed_identifiers(&self.gateway, sequence)?;
        let records = self
            .gateway
            .load_entities(&changes)
            .map_err(|e| IngestError::store(StoreQuery::LoadEntities, e))?;

        self.cursor.advance();
        self.stats.sequences_processed += 1;
        self.stats.entities_emitted += records.len() as u64;

        debug!(
            "sequence {sequence}: {} identifiers, {} records",
            changes.len(),
            records.len()
        );

        Ok(Some(PullBatch {
            sequence,
            changed: changes.len(),
            records,
        }))
    }

    pub fn current_sequence(&self) -> SequenceNumber {
        self.cursor.current_sequence()
    }

    pub fn stats(&self) -> PullStats {
        self.stats
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<G> std::fmt::Debug for PullDriver<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullDriver")
            .field("cursor", &self.cursor)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
