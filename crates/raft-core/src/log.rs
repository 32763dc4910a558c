//! # log
//!
//! why: describe the records the log window stages
//! relations: buffered by window.rs, persisted via raft-storage
//! what: LogEntry struct, Snapshot metadata

use serde::{Deserialize, Serialize};

/// A single entry in the replicated log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The term when this entry was created
    pub term: u64,
    /// The index of this entry in the log (1-indexed)
    pub index: u64,
    /// The command to be applied to the state machine
    pub command: Vec<u8>,
}

impl LogEntry {
    /// Create a new log entry
    pub fn new(term: u64, index: u64, command: Vec<u8>) -> Self {
        Self { term, index, command }
    }
}

/// Metadata of an installed snapshot: everything up to and including
/// `index` is covered by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Last log index covered by the snapshot
    pub index: u64,
    /// Term of the entry at `index`
    pub term: u64,
}

impl Snapshot {
    pub fn new(index: u64, term: u64) -> Self {
        Self { index, term }
    }
}
