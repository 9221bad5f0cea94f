//! Construction-time configuration for the pull driver.

use serde::{Deserialize, Serialize};

use crate::types::SequenceNumber;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Explicit first sequence to process. When absent the cursor starts one
    /// past the store's current head.
    pub starting_sequence: Option<SequenceNumber>,
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_starting_sequence(mut self, seq: impl Into<SequenceNumber>) -> Self {
        self.starting_sequence = Some(seq.into());
        self
    }

    /// The explicit starting sequence, if any. Zero is a real override: the
    /// first pull then fast-forwards to the head and processes it.
    pub fn starting_override(&self) -> Option<SequenceNumber> {
        self.starting_sequence
    }
}
