//! Sequence cursor: the next sequence to ingest, plus the gap policy.
//!
//! A missing sequence is never an error. If the store's head is ahead of the
//! cursor the gap is skipped by jumping to the head; otherwise the store has
//! not caught up yet and the cursor waits where it is.

use tracing::{debug, info};

use crate::config::IngestConfig;
use crate::error::{IngestError, Result, StoreQuery};
use crate::gateway::LedgerGateway;
use crate::types::SequenceNumber;

// ─── Check Outcome ───────────────────────────────────────────────

/// Result of [`SequenceCursor::check_advanceable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorCheck {
    /// The current sequence is materialized and can be processed.
    Ready,
    /// The current sequence is missing. The cursor moved `from` → `to`
    /// (`to == from` when the store is stalled). Nothing to process this call.
    FastForwarded {
        from: SequenceNumber,
        to: SequenceNumber,
    },
}

impl CursorCheck {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether the cursor actually jumped over a gap.
    pub fn skipped_gap(&self) -> bool {
        matches!(self, Self::FastForwarded { from, to } if to > from)
    }
}

// ─── Cursor ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceCursor {
    current: SequenceNumber,
}

impl SequenceCursor {
    pub fn new(start: impl Into<SequenceNumber>) -> Self {
        Self {
            current: start.into(),
        }
    }

    /// Start from the configured override, or one past the store's head.
    pub fn initialize<G: LedgerGateway>(gateway: &G, config: &IngestConfig) -> Result<Self> {
        if let Some(start) = config.starting_override() {
            info!("starting at configured sequence {start}");
            return Ok(Self::new(start));
        }

        let head = gateway
            .max_known_sequence()
            .map_err(|e| IngestError::store(StoreQuery::MaxKnownSequence, e))?;
        let start = head.next();
        info!("starting one past store head {head}: {start}");
        Ok(Self::new(start))
    }

    pub fn current_sequence(&self) -> SequenceNumber {
        self.current
    }

    /// Check whether the current sequence can be processed, applying the
    /// fast-forward rule when it cannot. Never moves the cursor backward.
    pub fn check_advanceable<G: LedgerGateway>(&mut self, gateway: &G) -> Result<CursorCheck> {
        let exists = gateway
            .sequence_exists(self.current)
            .map_err(|e| IngestError::store(StoreQuery::SequenceExists, e))?;
        if exists {
            return Ok(CursorCheck::Ready);
        }

        let head = gateway
            .max_known_sequence()
            .map_err(|e| IngestError::store(StoreQuery::MaxKnownSequence, e))?;
        let from = self.current;

        if head > from {
            info!(
                "sequence {from} missing, fast-forwarding to head {head} ({} sequences passed over)",
                from.distance_to(head)
            );
            self.current = head;
        } else {
            debug!("sequence {from} not materialized yet (head {head})");
        }

        Ok(CursorCheck::FastForwarded {
            from,
            to: self.current,
        })
    }

    /// Move to the next sequence. Only call after a `Ready` sequence was
    /// fully processed.
    pub fn advance(&mut self) {
        self.current = self.current.next();
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::testing::FakeGateway;
    use proptest::prelude::*;

    fn arb_store() -> impl Strategy<Value = FakeGateway> {
        proptest::collection::btree_set(0u64..64, 0..16).prop_map(|seqs| {
            FakeGateway::with_sequences(seqs.into_iter().map(|s| (s, Vec::<String>::new())))
        })
    }

    proptest! {
        /// The check never moves the cursor backward, and lands either on the
        /// start (ready or stalled) or on the store head (gap).
        #[test]
        fn check_never_rewinds(gateway in arb_store(), start in 0u64..80) {
            let mut cursor = SequenceCursor::new(start);
            let check = cursor.check_advanceable(&gateway).unwrap();
            let now = cursor.current_sequence().get();
            prop_assert!(now >= start);

            let exists = gateway.sequences.contains_key(&start);
            let head = gateway.sequences.keys().next_back().copied().unwrap_or(0);
            match check {
                CursorCheck::Ready => {
                    prop_assert!(exists);
                    prop_assert_eq!(now, start);
                }
                CursorCheck::FastForwarded { from, to } => {
                    prop_assert!(!exists);
                    prop_assert_eq!(from.get(), start);
                    prop_assert_eq!(to.get(), now);
                    prop_assert_eq!(now, head.max(start));
                }
            }
        }

        /// Repeated checks against an unchanged store are idempotent.
        #[test]
        fn check_is_idempotent(gateway in arb_store(), start in 0u64..80) {
            let mut cursor = SequenceCursor::new(start);
            cursor.check_advanceable(&gateway).unwrap();
            let first = cursor.current_sequence();
            cursor.check_advanceable(&gateway).unwrap();
            prop_assert_eq!(cursor.current_sequence(), first);
        }
    }
}
