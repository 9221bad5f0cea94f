//! ledgerpull-sqlite: SQLite IO boundary for ledger ingestion.
//! Reads a stellar-core style schema (`ledgerheaders`, `accounts`,
//! `trustlines`, `accountdata`) and materializes account records.
//! No cursor logic lives here.

pub mod gateway;
pub mod record;
pub mod store;

pub use gateway::{IdentifierCoverage, SqliteGateway};
pub use record::{AccountEntry, AccountRecord, AssetType, DataEntry, TrustLineEntry};
pub use store::LedgerStore;
