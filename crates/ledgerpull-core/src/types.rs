use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::collections::hash_set;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

// ─── Sequence Number ─────────────────────────────────────────────

/// Position of one unit of ledger history. Totally ordered; the store may
/// leave gaps where a unit was never materialized.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub const ZERO: Self = Self(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The sequence immediately after this one. Saturates at `u64::MAX`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Steps from `self` forward to `other`, i.e. how many sequences a jump
    /// from `self` to `other` passes over (`self` included, `other` not).
    /// Zero when `other` is not later.
    pub fn distance_to(self, other: Self) -> u64 {
        other.0.saturating_sub(self.0)
    }
}

impl From<u64> for SequenceNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<SequenceNumber> for u64 {
    fn from(seq: SequenceNumber) -> Self {
        seq.0
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SequenceNumber {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

// ─── Change Set ──────────────────────────────────────────────────

/// Entity identifier as stored in the ledger (e.g. an account id).
pub type Identifier = String;

/// Deduplicated identifiers touched at one sequence. Iteration order is
/// unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    ids: HashSet<Identifier>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Insert an identifier. Returns `false` if it was already present.
    pub fn insert(&mut self, id: impl Into<Identifier>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn iter(&self) -> hash_set::Iter<'_, Identifier> {
        self.ids.iter()
    }

    /// Identifiers in ascending order, for callers that need a stable layout
    /// (SQL parameter lists, logs, tests).
    pub fn sorted(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl FromIterator<Identifier> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Identifier>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_owned).collect()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Identifier;
    type IntoIter = hash_set::IntoIter<Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Identifier;
    type IntoIter = hash_set::Iter<'a, Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_next_increments_by_one() {
        assert_eq!(SequenceNumber::new(10).next(), SequenceNumber::new(11));
    }

    #[test]
    fn sequence_next_saturates() {
        let max = SequenceNumber::new(u64::MAX);
        assert_eq!(max.next(), max);
    }

    #[test]
    fn sequence_parses_and_displays() {
        let seq: SequenceNumber = " 42 ".parse().expect("valid");
        assert_eq!(seq.get(), 42);
        assert_eq!(seq.to_string(), "42");
        assert!("abc".parse::<SequenceNumber>().is_err());
    }

    #[test]
    fn sequence_serializes_transparently() {
        let json = serde_json::to_string(&SequenceNumber::new(7)).expect("serialize");
        assert_eq!(json, "7");
        let back: SequenceNumber = serde_json::from_str("7").expect("deserialize");
        assert_eq!(back, SequenceNumber::new(7));
    }

    #[test]
    fn distance_counts_passed_over_sequences() {
        let a = SequenceNumber::new(10);
        // 10, 11, 12, 13, 14 are passed over on the way to 15.
        assert_eq!(a.distance_to(SequenceNumber::new(15)), 5);
        assert_eq!(a.distance_to(a.next()), 1);
        assert_eq!(a.distance_to(a), 0);
        assert_eq!(a.distance_to(SequenceNumber::new(3)), 0);
    }

    #[test]
    fn change_set_collapses_duplicates() {
        let set: ChangeSet = ["a", "b", "a", "c"].into_iter().collect();
        assert_eq!(set.len(), 3);
        assert!(set.contains("a"));
        assert!(set.contains("b"));
        assert!(set.contains("c"));
        assert_eq!(set.sorted(), vec!["a", "b", "c"]);
    }

    #[test]
    fn change_set_insert_reports_novelty() {
        let mut set = ChangeSet::new();
        assert!(set.is_empty());
        assert!(set.insert("x1"));
        assert!(!set.insert("x1"));
        assert_eq!(set.len(), 1);
    }
}
