//! `LedgerGateway` over a [`LedgerStore`].

use std::collections::HashMap;
use std::str::FromStr;

use ledgerpull_core::{ChangeSet, Identifier, LedgerGateway, SequenceNumber};
use rusqlite::{Connection, Result, Row, params, params_from_iter};
use tracing::debug;

use crate::record::{AccountEntry, AccountRecord, AssetType, DataEntry, TrustLineEntry};
use crate::store::{LedgerStore, from_sql_seq, to_sql_seq};

/// Tables whose rows carry an account id and a `lastmodified` stamp.
const ENTRY_TABLES: [&str; 3] = ["accounts", "trustlines", "accountdata"];

/// Ids bound per `IN (...)` query; stays under SQLite's default host
/// parameter limit of 999.
const LOAD_BATCH: usize = 500;

/// How changed identifiers are collected across the entry tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierCoverage {
    /// One `UNION ALL` query over every entry table.
    #[default]
    Combined,
    /// One query per entry table, concatenated.
    PerTable,
}

impl IdentifierCoverage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Combined => "combined",
            Self::PerTable => "per-table",
        }
    }
}

impl FromStr for IdentifierCoverage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "combined" => Ok(Self::Combined),
            "per-table" | "per_table" => Ok(Self::PerTable),
            _ => Err(format!("unknown identifier coverage: {s}")),
        }
    }
}

pub struct SqliteGateway {
    store: LedgerStore,
    coverage: IdentifierCoverage,
}

impl SqliteGateway {
    pub fn new(store: LedgerStore, coverage: IdentifierCoverage) -> Self {
        Self { store, coverage }
    }

    pub fn coverage(&self) -> IdentifierCoverage {
        self.coverage
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    fn conn(&self) -> &Connection {
        &self.store.conn
    }

    fn changed_combined(&self, seq: i64) -> Result<Vec<Identifier>> {
        let mut stmt = self.conn().prepare_cached(
            "SELECT accountid FROM accounts WHERE lastmodified = ?1
             UNION ALL
             SELECT accountid FROM trustlines WHERE lastmodified = ?1
             UNION ALL
             SELECT accountid FROM accountdata WHERE lastmodified = ?1",
        )?;
        let rows = stmt.query_map(params![seq], |row| row.get(0))?;
        rows.collect()
    }

    fn changed_per_table(&self, seq: i64) -> Result<Vec<Identifier>> {
        let mut ids = Vec::new();
        for table in ENTRY_TABLES {
            let mut stmt = self.conn().prepare_cached(&format!(
                "SELECT accountid FROM {table} WHERE lastmodified = ?1"
            ))?;
            let rows = stmt.query_map(params![seq], |row| row.get::<_, String>(0))?;
            for row in rows {
                ids.push(row?);
            }
        }
        Ok(ids)
    }

    fn load_batch(&self, ids: &[&str]) -> Result<Vec<AccountRecord>> {
        let vars = placeholders(ids.len());

        let mut trustlines: HashMap<String, Vec<TrustLineEntry>> = HashMap::new();
        let mut stmt = self.conn().prepare(&format!(
            "SELECT accountid, assettype, issuer, assetcode, tlimit, balance, flags, lastmodified
             FROM trustlines WHERE accountid IN ({vars})
             ORDER BY accountid, assetcode, issuer"
        ))?;
        for line in stmt.query_map(params_from_iter(ids), trustline_from_row)? {
            let line = line?;
            trustlines
                .entry(line.account_id.clone())
                .or_default()
                .push(line);
        }

        let mut data: HashMap<String, Vec<DataEntry>> = HashMap::new();
        let mut stmt = self.conn().prepare(&format!(
            "SELECT accountid, dataname, datavalue, lastmodified
             FROM accountdata WHERE accountid IN ({vars})
             ORDER BY accountid, dataname"
        ))?;
        for entry in stmt.query_map(params_from_iter(ids), data_entry_from_row)? {
            let entry = entry?;
            data.entry(entry.account_id.clone()).or_default().push(entry);
        }

        let mut stmt = self.conn().prepare(&format!(
            "SELECT accountid, balance, seqnum, numsubentries, homedomain, flags, lastmodified
             FROM accounts WHERE accountid IN ({vars})
             ORDER BY accountid"
        ))?;
        let accounts = stmt.query_map(params_from_iter(ids), account_from_row)?;

        let mut records = Vec::with_capacity(ids.len());
        for account in accounts {
            let account = account?;
            records.push(AccountRecord {
                trustlines: trustlines.remove(&account.account_id).unwrap_or_default(),
                data: data.remove(&account.account_id).unwrap_or_default(),
                account,
            });
        }
        Ok(records)
    }
}

impl LedgerGateway for SqliteGateway {
    type Record = AccountRecord;
    type Error = rusqlite::Error;

    fn sequence_exists(&self, seq: SequenceNumber) -> Result<bool> {
        self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM ledgerheaders WHERE ledgerseq = ?1)",
            params![to_sql_seq(seq)?],
            |row| row.get(0),
        )
    }

    fn max_known_sequence(&self) -> Result<SequenceNumber> {
        let max: i64 = self.conn().query_row(
            "SELECT COALESCE(MAX(ledgerseq), 0) FROM ledgerheaders",
            [],
            |row| row.get(0),
        )?;
        from_sql_seq(max)
    }

    fn changed_identifiers(&self, seq: SequenceNumber) -> Result<Vec<Identifier>> {
        let seq = to_sql_seq(seq)?;
        match self.coverage {
            IdentifierCoverage::Combined => self.changed_combined(seq),
            IdentifierCoverage::PerTable => self.changed_per_table(seq),
        }
    }

    /// Accounts come back ordered by id. Ids whose account row is gone
    /// (merged away) produce no record.
    fn load_entities(&self, ids: &ChangeSet) -> Result<Vec<AccountRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sorted = ids.sorted();
        let mut records = Vec::with_capacity(sorted.len());
        for batch in sorted.chunks(LOAD_BATCH) {
            records.extend(self.load_batch(batch)?);
        }

        if records.len() < sorted.len() {
            debug!(
                "{} of {} changed accounts no longer exist",
                sorted.len() - records.len(),
                sorted.len()
            );
        }
        Ok(records)
    }
}

fn placeholders(n: usize) -> String {
    let mut vars = "?,".repeat(n);
    vars.pop();
    vars
}

fn account_from_row(row: &Row<'_>) -> Result<AccountEntry> {
    Ok(AccountEntry {
        account_id: row.get(0)?,
        balance: row.get(1)?,
        seq_num: row.get(2)?,
        num_subentries: row.get(3)?,
        home_domain: row.get(4)?,
        flags: row.get(5)?,
        last_modified: from_sql_seq(row.get(6)?)?,
    })
}

fn trustline_from_row(row: &Row<'_>) -> Result<TrustLineEntry> {
    let asset_type: i64 = row.get(1)?;
    Ok(TrustLineEntry {
        account_id: row.get(0)?,
        asset_type: AssetType::from_i64(asset_type)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(1, asset_type))?,
        issuer: row.get(2)?,
        asset_code: row.get(3)?,
        limit: row.get(4)?,
        balance: row.get(5)?,
        flags: row.get(6)?,
        last_modified: from_sql_seq(row.get(7)?)?,
    })
}

fn data_entry_from_row(row: &Row<'_>) -> Result<DataEntry> {
    Ok(DataEntry {
        account_id: row.get(0)?,
        name: row.get(1)?,
        value: row.get(2)?,
        last_modified: from_sql_seq(row.get(3)?)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
