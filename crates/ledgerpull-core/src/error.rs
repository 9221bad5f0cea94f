//! Error types for ledger ingestion.

use std::fmt;

use thiserror::Error;

/// Boxed gateway error carried as the source of [`IngestError::StoreQuery`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which gateway query an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreQuery {
    SequenceExists,
    MaxKnownSequence,
    ChangedIdentifiers,
    LoadEntities,
}

impl StoreQuery {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SequenceExists => "sequence_exists",
            Self::MaxKnownSequence => "max_known_sequence",
            Self::ChangedIdentifiers => "changed_identifiers",
            Self::LoadEntities => "load_entities",
        }
    }
}

impl fmt::Display for StoreQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// The underlying store could not complete a query. The cursor has not
    /// moved and no records were returned.
    #[error("store query {query} failed: {source}")]
    StoreQuery {
        query: StoreQuery,
        #[source]
        source: BoxError,
    },
}

impl IngestError {
    pub fn store(query: StoreQuery, source: impl Into<BoxError>) -> Self {
        Self::StoreQuery {
            query,
            source: source.into(),
        }
    }

    /// The gateway query that failed.
    pub fn query(&self) -> StoreQuery {
        match self {
            Self::StoreQuery { query, .. } => *query,
        }
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn store_error_names_query_and_keeps_source() {
        let io = std::io::Error::other("connection reset");
        let err = IngestError::store(StoreQuery::LoadEntities, io);

        assert_eq!(err.query(), StoreQuery::LoadEntities);
        assert_eq!(
            err.to_string(),
            "store query load_entities failed: connection reset"
        );
        assert!(err.source().is_some());
    }
}
