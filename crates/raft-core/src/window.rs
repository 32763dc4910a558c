//! # window
//!
//! why: hold log entries between their arrival and their confirmed durability
//! relations: uses log.rs for entries/snapshots, message.rs for durability acks
//! what: LogWindow, tail merge, saved watermark, compaction, pending snapshot
//!
//! The window covers indices `[marker_index, marker_index + len)`. Every
//! buffer position is `log_index - marker_index`.

use tracing::{debug, trace, warn};

use crate::config::WindowConfig;
use crate::error::InvariantViolation;
use crate::log::{LogEntry, Snapshot};
use crate::message::UpdateCommit;

/// In-memory staging area for one replica's log tail.
///
/// Single-writer: the owning replica's processing context is the only caller.
#[derive(Debug, Clone)]
pub struct LogWindow {
    snapshot: Option<Snapshot>,
    entries: Vec<LogEntry>,
    marker_index: u64,
    saved_to: u64,
    config: WindowConfig,
}

impl LogWindow {
    /// Create a window whose last durable index is `last_index`
    pub fn new(last_index: u64) -> Self {
        Self::with_config(last_index, WindowConfig::default())
    }

    pub fn with_config(last_index: u64, config: WindowConfig) -> Self {
        Self {
            snapshot: None,
            entries: Vec::new(),
            marker_index: last_index + 1,
            saved_to: last_index,
            config,
        }
    }

    pub fn marker_index(&self) -> u64 {
        self.marker_index
    }

    pub fn saved_to(&self) -> u64 {
        self.saved_to
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All buffered entries, starting at `marker_index`
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    fn upper_bound(&self) -> u64 {
        self.marker_index + self.entries.len() as u64
    }

    fn position(&self, index: u64) -> usize {
        (index - self.marker_index) as usize
    }

    fn check_marker_index(&self) -> Result<(), InvariantViolation> {
        match self.entries.first() {
            Some(first) if first.index != self.marker_index => {
                Err(InvariantViolation::MarkerMismatch {
                    marker_index: self.marker_index,
                    first_index: first.index,
                })
            }
            _ => Ok(()),
        }
    }

    // -- read accessors --

    /// Buffered entries with index in `[low, high)`
    pub fn entries_in_range(&self, low: u64, high: u64) -> Result<&[LogEntry], InvariantViolation> {
        let upper_bound = self.upper_bound();
        if low > high || low < self.marker_index {
            return Err(InvariantViolation::InvalidRange {
                low,
                high,
                marker_index: self.marker_index,
            });
        }
        if high > upper_bound {
            return Err(InvariantViolation::RangeOutOfBounds { high, upper_bound });
        }
        Ok(&self.entries[self.position(low)..self.position(high)])
    }

    pub fn snapshot_index(&self) -> Option<u64> {
        self.snapshot.map(|ss| ss.index)
    }

    /// Highest buffered index, falling back to the pending snapshot
    pub fn last_index(&self) -> Option<u64> {
        self.entries
            .last()
            .map(|entry| entry.index)
            .or_else(|| self.snapshot_index())
    }

    /// Term of the entry at `index`, if the window still knows it
    pub fn term_at(&self, index: u64) -> Option<u64> {
        if index < self.marker_index {
            return self
                .snapshot
                .filter(|ss| ss.index == index)
                .map(|ss| ss.term);
        }
        self.entries.get(self.position(index)).map(|entry| entry.term)
    }

    // -- durability --

    /// Suffix of the buffer not yet confirmed durable
    pub fn entries_to_save(&self) -> &[LogEntry] {
        let offset = self.position(self.saved_to + 1);
        if offset > self.entries.len() {
            debug!(
                marker_index = self.marker_index,
                saved_to = self.saved_to,
                len = self.entries.len(),
                "nothing to save"
            );
            return &[];
        }
        &self.entries[offset..]
    }

    pub fn commit_update(&mut self, cu: UpdateCommit) {
        if cu.stable_log_to > 0 {
            self.saved_log_to(cu.stable_log_to, cu.stable_log_term);
        }
        if cu.stable_snapshot_to > 0 {
            self.saved_snapshot_to(cu.stable_snapshot_to);
        }
    }

    /// Advance the saved watermark to `index` if the buffered entry there
    /// still carries `term`. Stale reports are ignored.
    pub fn saved_log_to(&mut self, index: u64, term: u64) {
        if index < self.marker_index {
            trace!(index, marker_index = self.marker_index, "saved index already compacted");
            return;
        }
        match self.entries.get(self.position(index)) {
            Some(entry) if entry.term == term => self.saved_to = index,
            Some(entry) => {
                debug!(index, term, buffered_term = entry.term, "ignoring save of superseded entry");
            }
            None => debug!(index, upper_bound = self.upper_bound(), "saved index beyond buffer"),
        }
    }

    /// Drop every buffered entry below `index` once it has been applied
    pub fn applied_log_to(&mut self, index: u64) -> Result<(), InvariantViolation> {
        if index < self.marker_index {
            return Ok(());
        }
        let Some(last) = self.entries.last().map(|entry| entry.index) else {
            return Ok(());
        };
        if index > last {
            return Ok(());
        }
        let compacted = self.position(index);
        self.entries.drain(..compacted);
        self.marker_index = index;
        if self.saved_to < index - 1 {
            warn!(index, saved_to = self.saved_to, "compacted entries that were never saved");
            self.saved_to = index - 1;
        }
        self.resize_entry_vec();
        self.check_marker_index()
    }

    /// Acknowledge that the pending snapshot at `index` is durable
    pub fn saved_snapshot_to(&mut self, index: u64) {
        match self.snapshot_index() {
            Some(pending) if pending == index => self.snapshot = None,
            Some(pending) => warn!(pending, index, "snapshot index does not match"),
            None => {}
        }
    }

    // -- reconciliation --

    fn resize_entry_vec(&mut self) {
        let free = self.entries.capacity() - self.entries.len();
        if free < self.config.min_entry_slice_free_size {
            let target = self
                .config
                .entry_slice_size
                .max(self.entries.len() + self.config.min_entry_slice_free_size);
            let mut resized = Vec::with_capacity(target);
            resized.append(&mut self.entries);
            self.entries = resized;
        }
    }

    /// Reconcile `entries` against the buffered tail: append, replace the
    /// whole buffer, or truncate the conflicting suffix and append.
    pub fn merge(&mut self, entries: &[LogEntry]) -> Result<(), InvariantViolation> {
        let first_new_index = entries.first().ok_or(InvariantViolation::EmptyMerge)?.index;
        if first_new_index == 0 {
            return Err(InvariantViolation::ZeroIndex);
        }
        check_contiguous(entries)?;

        if first_new_index == self.upper_bound() {
            if let Some(last) = self.entries.last() {
                check_follows(last, &entries[0])?;
            }
            self.entries.extend_from_slice(entries);
        } else if first_new_index <= self.marker_index {
            debug!(
                first_new_index,
                marker_index = self.marker_index,
                "replacing buffered entries"
            );
            let mut owned = Vec::with_capacity(self.config.entry_slice_size.max(entries.len()));
            owned.extend_from_slice(entries);
            self.entries = owned;
            self.marker_index = first_new_index;
            self.saved_to = first_new_index - 1;
        } else {
            let kept = self.entries_in_range(self.marker_index, first_new_index)?.len();
            check_follows(&self.entries[kept - 1], &entries[0])?;
            debug!(
                first_new_index,
                discarded = self.entries.len() - kept,
                "truncating conflicting tail"
            );
            self.entries.truncate(kept);
            self.entries.extend_from_slice(entries);
            self.saved_to = self.saved_to.min(first_new_index - 1);
        }
        self.resize_entry_vec();
        self.check_marker_index()
    }

    /// Install `snapshot` as pending, discarding every buffered entry
    pub fn restore(&mut self, snapshot: Snapshot) {
        debug!(index = snapshot.index, term = snapshot.term, "restoring snapshot");
        self.snapshot = Some(snapshot);
        self.marker_index = snapshot.index + 1;
        self.entries = Vec::new();
        self.saved_to = snapshot.index;
    }
}

fn check_follows(prev: &LogEntry, next: &LogEntry) -> Result<(), InvariantViolation> {
    if next.index != prev.index + 1 {
        return Err(InvariantViolation::NonContiguous {
            prev: prev.index,
            next: next.index,
        });
    }
    Ok(())
}

fn check_contiguous(entries: &[LogEntry]) -> Result<(), InvariantViolation> {
    entries
        .windows(2)
        .try_for_each(|pair| check_follows(&pair[0], &pair[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(range: std::ops::RangeInclusive<u64>, term: u64) -> Vec<LogEntry> {
        range.map(|i| LogEntry::new(term, i, vec![i as u8])).collect()
    }

    #[test]
    fn new_window_starts_after_last_index() {
        let window = LogWindow::new(10);
        assert_eq!(window.marker_index(), 11);
        assert_eq!(window.saved_to(), 10);
        assert!(window.is_empty());
        assert_eq!(window.last_index(), None);
    }

    #[test]
    fn check_contiguous_rejects_gap() {
        let mut ents = entries(1..=3, 1);
        ents[2].index = 5;
        assert_eq!(
            check_contiguous(&ents),
            Err(InvariantViolation::NonContiguous { prev: 2, next: 5 })
        );
    }

    #[test]
    fn resize_grows_to_configured_capacity() {
        let config = WindowConfig { entry_slice_size: 16, min_entry_slice_free_size: 4 };
        let mut window = LogWindow::with_config(0, config);
        window.merge(&entries(1..=3, 1)).unwrap();
        assert!(window.entries.capacity() >= 16);
    }

    #[test]
    fn resize_keeps_minimum_free_room_past_target() {
        let config = WindowConfig { entry_slice_size: 4, min_entry_slice_free_size: 2 };
        let mut window = LogWindow::with_config(0, config);
        window.merge(&entries(1..=10, 1)).unwrap();
        assert!(window.entries.capacity() - window.entries.len() >= 2);
    }
}
