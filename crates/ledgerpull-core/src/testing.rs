//! In-memory gateway for unit tests.

use std::cell::RefCell;
use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::StoreQuery;
use crate::gateway::LedgerGateway;
use crate::types::{ChangeSet, Identifier, SequenceNumber};

#[derive(Debug, Error)]
#[error("fake store refused {0}")]
pub(crate) struct FakeStoreError(pub StoreQuery);

/// Materialized sequences mapped to the raw identifiers changed at each.
/// The head is the highest key. Records are `"record:{id}"` strings.
#[derive(Debug, Default)]
pub(crate) struct FakeGateway {
    pub sequences: BTreeMap<u64, Vec<Identifier>>,
    pub fail_on: Option<StoreQuery>,
    pub calls: RefCell<Vec<StoreQuery>>,
    pub loads: RefCell<Vec<ChangeSet>>,
}

impl FakeGateway {
    pub fn with_sequences<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = (u64, Vec<S>)>,
        S: Into<Identifier>,
    {
        Self {
            sequences: sequences
                .into_iter()
                .map(|(seq, ids)| (seq, ids.into_iter().map(Into::into).collect()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing(mut self, query: StoreQuery) -> Self {
        self.fail_on = Some(query);
        self
    }

    pub fn calls(&self) -> Vec<StoreQuery> {
        self.calls.borrow().clone()
    }

    fn enter(&self, query: StoreQuery) -> Result<(), FakeStoreError> {
        self.calls.borrow_mut().push(query);
        if self.fail_on == Some(query) {
            return Err(FakeStoreError(query));
        }
        Ok(())
    }
}

impl LedgerGateway for FakeGateway {
    type Record = String;
    type Error = FakeStoreError;

    fn sequence_exists(&self, seq: SequenceNumber) -> Result<bool, Self::Error> {
        self.enter(StoreQuery::SequenceExists)?;
        Ok(self.sequences.contains_key(&seq.get()))
    }

    fn max_known_sequence(&self) -> Result<SequenceNumber, Self::Error> {
        self.enter(StoreQuery::MaxKnownSequence)?;
        Ok(self
            .sequences
            .keys()
            .next_back()
            .copied()
            .map(SequenceNumber::new)
            .unwrap_or(SequenceNumber::ZERO))
    }

    fn changed_identifiers(&self, seq: SequenceNumber) -> Result<Vec<Identifier>, Self::Error> {
        self.enter(StoreQuery::ChangedIdentifiers)?;
        Ok(self.sequences.get(&seq.get()).cloned().unwrap_or_default())
    }

    fn load_entities(&self, ids: &ChangeSet) -> Result<Vec<Self::Record>, Self::Error> {
        self.enter(StoreQuery::LoadEntities)?;
        self.loads.borrow_mut().push(ids.clone());
        Ok(ids.sorted().into_iter().map(|id| format!("record:{id}")).collect())
    }
}
