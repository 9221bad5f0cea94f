//! LedgerGateway trait: the request/response boundary to the ledger store.

use crate::error::BoxError;
use crate::types::{ChangeSet, Identifier, SequenceNumber};

/// Point queries against a sequence-numbered ledger store.
///
/// Implementations hold no ingestion state. Coverage of
/// [`changed_identifiers`](LedgerGateway::changed_identifiers) is the
/// implementation's contract: it must report every identifier touched at the
/// sequence, across all categories of change it knows about. Duplicates are
/// allowed; the assembler removes them.
pub trait LedgerGateway {
    /// Materialized entity produced by [`load_entities`](LedgerGateway::load_entities).
    type Record;
    type Error: Into<BoxError>;

    /// Whether `seq` exists as a materialized unit in the store.
    fn sequence_exists(&self, seq: SequenceNumber) -> Result<bool, Self::Error>;

    /// Highest materialized sequence, or [`SequenceNumber::ZERO`] for an empty store.
    fn max_known_sequence(&self) -> Result<SequenceNumber, Self::Error>;

    /// Raw identifiers last modified at `seq`.
    fn changed_identifiers(&self, seq: SequenceNumber) -> Result<Vec<Identifier>, Self::Error>;

    /// Load the current records for `ids`. Identifiers with no backing record
    /// are skipped.
    fn load_entities(&self, ids: &ChangeSet) -> Result<Vec<Self::Record>, Self::Error>;
}

impl<T: LedgerGateway + ?Sized> LedgerGateway for &T {
    type Record = T::Record;
    type Error = T::Error;

    fn sequence_exists(&self, seq: SequenceNumber) -> Result<bool, Self::Error> {
        (**self).sequence_exists(seq)
    }

    fn max_known_sequence(&self) -> Result<SequenceNumber, Self::Error> {
        (**self).max_known_sequence()
    }

    fn changed_identifiers(&self, seq: SequenceNumber) -> Result<Vec<Identifier>, Self::Error> {
        (**self).changed_identifiers(seq)
    }

    fn load_entities(&self, ids: &ChangeSet) -> Result<Vec<Self::Record>, Self::Error> {
        (**self).load_entities(ids)
    }
}
