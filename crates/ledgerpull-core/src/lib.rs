//! ledgerpull-core: incremental ingestion from a sequence-numbered ledger store.
//! Holds the sequence cursor, the change-set assembler and the pull driver.
//! Storage access goes through the [`LedgerGateway`] trait; no IO lives here.

pub mod assembler;
pub mod config;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::ChangeSetAssembler;
pub use config::IngestConfig;
pub use cursor::{CursorCheck, SequenceCursor};
pub use driver::{PullBatch, PullDriver, PullStats};
pub use error::{BoxError, IngestError, StoreQuery};
pub use gateway::LedgerGateway;
pub use types::{ChangeSet, Identifier, SequenceNumber};
