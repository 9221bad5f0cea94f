//! SQLite connection and schema for the ledger store.
//!
//! The schema mirrors the subset of stellar-core's tables that ingestion reads.
//! Write helpers exist for seeding fixtures and local replays; production
//! databases are written by the ledger node itself.

use std::path::Path;

use ledgerpull_core::SequenceNumber;
use rusqlite::{Connection, OpenFlags, Result, params};

use crate::record::{AccountEntry, DataEntry, TrustLineEntry};

/// SQLite-backed ledger store.
pub struct LedgerStore {
    pub(crate) conn: Connection,
}

impl LedgerStore {
    /// Open (or create) a database at the given filesystem path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open a ledger node's existing database read-only. Fails when the file
    /// is missing; never creates or migrates anything.
    pub fn open_existing(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database. Useful for testing.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Create the schema if it does not already exist.
    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ledgerheaders (
                ledgerseq      INTEGER PRIMARY KEY CHECK (ledgerseq >= 0),
                ledgerhash     TEXT NOT NULL,
                closetime      INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS accounts (
                accountid      TEXT PRIMARY KEY,
                balance        INTEGER NOT NULL,
                seqnum         INTEGER NOT NULL,
                numsubentries  INTEGER NOT NULL DEFAULT 0,
                homedomain     TEXT NOT NULL DEFAULT '',
                flags          INTEGER NOT NULL DEFAULT 0,
                lastmodified   INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS accountsbylastmodified ON accounts (lastmodified);
            CREATE TABLE IF NOT EXISTS trustlines (
                accountid      TEXT NOT NULL,
                assettype      INTEGER NOT NULL,
                issuer         TEXT NOT NULL,
                assetcode      TEXT NOT NULL,
                tlimit         INTEGER NOT NULL,
                balance        INTEGER NOT NULL,
                flags          INTEGER NOT NULL DEFAULT 0,
                lastmodified   INTEGER NOT NULL,
                PRIMARY KEY (accountid, issuer, assetcode)
            );
            CREATE INDEX IF NOT EXISTS trustlinesbylastmodified ON trustlines (lastmodified);
            CREATE TABLE IF NOT EXISTS accountdata (
                accountid      TEXT NOT NULL,
                dataname       TEXT NOT NULL,
                datavalue      TEXT NOT NULL,
                lastmodified   INTEGER NOT NULL,
                PRIMARY KEY (accountid, dataname)
            );
            CREATE INDEX IF NOT EXISTS accountdatabylastmodified ON accountdata (lastmodified);",
        )?;
        Ok(())
    }

    /// Record that ledger `seq` has been closed and materialized.
    pub fn insert_ledger_header(
        &self,
        seq: SequenceNumber,
        hash: &str,
        close_time: i64,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO ledgerheaders (ledgerseq, ledgerhash, closetime)
             VALUES (?1, ?2, ?3)",
            params![to_sql_seq(seq)?, hash, close_time],
        )?;
        Ok(())
    }

    /// Upsert a single account row.
    pub fn upsert_account(&self, account: &AccountEntry) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO accounts
                (accountid, balance, seqnum, numsubentries, homedomain, flags, lastmodified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                account.account_id,
                account.balance,
                account.seq_num,
                account.num_subentries,
                account.home_domain,
                account.flags,
                to_sql_seq(account.last_modified)?,
            ],
        )?;
        Ok(())
    }

    /// Upsert a single trust line row.
    pub fn upsert_trustline(&self, line: &TrustLineEntry) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO trustlines
                (accountid, assettype, issuer, assetcode, tlimit, balance, flags, lastmodified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                line.account_id,
                line.asset_type.as_i64(),
                line.issuer,
                line.asset_code,
                line.limit,
                line.balance,
                line.flags,
                to_sql_seq(line.last_modified)?,
            ],
        )?;
        Ok(())
    }

    /// Upsert a single data entry row.
    pub fn upsert_data_entry(&self, entry: &DataEntry) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO accountdata (accountid, dataname, datavalue, lastmodified)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.account_id,
                entry.name,
                entry.value,
                to_sql_seq(entry.last_modified)?,
            ],
        )?;
        Ok(())
    }

    /// Delete an account and everything hanging off it, as a merge would.
    pub fn remove_account(&self, account_id: &str) -> Result<()> {
        for sql in [
            "DELETE FROM trustlines WHERE accountid = ?1",
            "DELETE FROM accountdata WHERE accountid = ?1",
            "DELETE FROM accounts WHERE accountid = ?1",
        ] {
            self.conn.execute(sql, params![account_id])?;
        }
        Ok(())
    }
}

/// SQLite integers are signed; sequences above `i64::MAX` cannot be stored.
pub(crate) fn to_sql_seq(seq: SequenceNumber) -> Result<i64> {
    i64::try_from(seq.get())
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

pub(crate) fn from_sql_seq(value: i64) -> Result<SequenceNumber> {
    u64::try_from(value)
        .map(SequenceNumber::new)
        .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, value))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
