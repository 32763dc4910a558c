//! # message
//!
//! why: carry durability acknowledgements back into the log window
//! relations: produced by raft-storage after a flush, consumed by window.rs
//! what: UpdateCommit batch notification

use serde::{Deserialize, Serialize};

/// Batched notification from the durable stores.
///
/// A zero field means "no update of that kind".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCommit {
    /// Highest log index now on stable storage
    pub stable_log_to: u64,
    /// Term of the entry at `stable_log_to`
    pub stable_log_term: u64,
    /// Index of the snapshot now on stable storage
    pub stable_snapshot_to: u64,
}

impl UpdateCommit {
    /// Whether the notification carries nothing to apply
    pub fn is_empty(&self) -> bool {
        self.stable_log_to == 0 && self.stable_snapshot_to == 0
    }
}
