//! Ledger entry rows and the account record handed downstream.

use ledgerpull_core::SequenceNumber;
use serde::{Deserialize, Serialize};

/// Row of the `accounts` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub account_id: String,
    /// Native balance in stroops.
    pub balance: i64,
    /// Account transaction sequence number (not the ledger sequence).
    pub seq_num: i64,
    pub num_subentries: u32,
    pub home_domain: String,
    pub flags: u32,
    pub last_modified: SequenceNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Native,
    CreditAlphanum4,
    CreditAlphanum12,
}

impl AssetType {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Native => 0,
            Self::CreditAlphanum4 => 1,
            Self::CreditAlphanum12 => 2,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Native),
            1 => Some(Self::CreditAlphanum4),
            2 => Some(Self::CreditAlphanum12),
            _ => None,
        }
    }
}

/// Row of the `trustlines` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustLineEntry {
    pub account_id: String,
    pub asset_type: AssetType,
    pub asset_code: String,
    pub issuer: String,
    pub limit: i64,
    pub balance: i64,
    pub flags: u32,
    pub last_modified: SequenceNumber,
}

/// Row of the `accountdata` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    pub account_id: String,
    pub name: String,
    /// Base64 value as stored by the ledger.
    pub value: String,
    pub last_modified: SequenceNumber,
}

/// An account with its trust lines and data entries, loaded fresh from the
/// store for one pulled sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(flatten)]
    pub account: AccountEntry,
    pub trustlines: Vec<TrustLineEntry>,
    pub data: Vec<DataEntry>,
}

impl AccountRecord {
    pub fn id(&self) -> &str {
        &self.account.account_id
    }
}
