//! Change-set assembly: raw changed identifiers → deduplicated set.

use tracing::debug;

use crate::error::{IngestError, Result, StoreQuery};
use crate::gateway::LedgerGateway;
use crate::types::{ChangeSet, SequenceNumber};

/// Resolves which identifiers changed at a sequence. Category fan-out (primary
/// records, attributes, linked records) is the gateway's business; the
/// assembler only sees one combined list and collapses duplicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeSetAssembler;

impl ChangeSetAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Fetch and deduplicate the identifiers touched at `seq`. A gateway
    /// failure yields an error, never a partial set.
    pub fn resolve_changed_identifiers<G: LedgerGateway>(
        &self,
        gateway: &G,
        seq: SequenceNumber,
    ) -> Result<ChangeSet> {
        let raw = gateway
            .changed_identifiers(seq)
            .map_err(|e| IngestError::store(StoreQuery::ChangedIdentifiers, e))?;
        let raw_len = raw.len();
        let changes: ChangeSet = raw.into_iter().collect();

        debug!(
            "sequence {seq}: {raw_len} changed rows, {} unique identifiers",
            changes.len()
        );
        Ok(changes)
    }
}
