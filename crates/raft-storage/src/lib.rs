//! # raft-storage
//!
//! why: give the log window a durable home for its entries and snapshots
//! relations: drains raft-core's LogWindow, reports back with UpdateCommit
//! what: LogStore trait, FileStorage, InMemoryStorage, persist/open_window glue

use raft_core::{LogEntry, LogWindow, Snapshot, UpdateCommit, WindowConfig};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// trait for durable storage of the raft log
///
/// this abstraction allows the same flush path to work with:
/// - real filesystem (native)
/// - in-memory (testing)
pub trait LogStore {
    /// persist entries, replacing any stored entry at or after the first one
    fn save_entries(&mut self, entries: &[LogEntry]) -> io::Result<()>;

    /// persist snapshot metadata, dropping stored entries it covers
    fn save_snapshot(&mut self, snapshot: &Snapshot) -> io::Result<()>;

    /// load all log entries (for crash recovery)
    fn load_log(&self) -> io::Result<Vec<LogEntry>>;

    /// load the last persisted snapshot, if any
    fn load_snapshot(&self) -> io::Result<Option<Snapshot>>;

    /// highest durable index across the log and the snapshot
    fn last_index(&self) -> io::Result<u64> {
        let log_last = self.load_log()?.last().map_or(0, |e| e.index);
        let snapshot_last = self.load_snapshot()?.map_or(0, |ss| ss.index);
        Ok(log_last.max(snapshot_last))
    }

    /// clear all persisted state (for testing)
    fn clear(&mut self) -> io::Result<()>;
}

/// flush whatever the window holds that is not yet durable
///
/// returns the acknowledgement to feed back into `LogWindow::commit_update`
pub fn persist<S: LogStore>(window: &LogWindow, store: &mut S) -> io::Result<UpdateCommit> {
    let mut cu = UpdateCommit::default();

    if let Some(snapshot) = window.snapshot() {
        store.save_snapshot(snapshot)?;
        cu.stable_snapshot_to = snapshot.index;
    }

    let pending = window.entries_to_save();
    if let Some(last) = pending.last() {
        store.save_entries(pending)?;
        cu.stable_log_to = last.index;
        cu.stable_log_term = last.term;
    }

    debug!(
        stable_log_to = cu.stable_log_to,
        stable_snapshot_to = cu.stable_snapshot_to,
        entries = pending.len(),
        "persisted window"
    );
    Ok(cu)
}

/// create the startup window from the highest durable index
pub fn open_window<S: LogStore>(store: &S, config: WindowConfig) -> io::Result<LogWindow> {
    let last_index = store.last_index()?;
    Ok(LogWindow::with_config(last_index, config))
}

fn merge_into(log: &mut Vec<LogEntry>, entries: &[LogEntry]) {
    if let Some(first) = entries.first() {
        log.retain(|e| e.index < first.index);
        log.extend(entries.iter().cloned());
    }
}

// -- file storage implementation --

/// file-based storage implementation using std::fs
///
/// stores state in a directory with:
/// - log.json: array of log entries
/// - snapshot.json: metadata of the last snapshot
pub struct FileStorage {
    /// directory path for storing state files
    dir: PathBuf,
}

impl FileStorage {
    /// create a new filestorage at the given directory
    /// creates the directory if it doesn't exist
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join("log.json")
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join("snapshot.json")
    }

    /// atomic write: write to temp file then rename
    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }

        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl LogStore for FileStorage {
    fn save_entries(&mut self, entries: &[LogEntry]) -> io::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut log = self.load_log()?;
        merge_into(&mut log, entries);
        self.write_json(&self.log_path(), &log)
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        self.write_json(&self.snapshot_path(), snapshot)?;

        let mut log = self.load_log()?;
        let before = log.len();
        log.retain(|e| e.index > snapshot.index);
        if log.len() != before {
            self.write_json(&self.log_path(), &log)?;
        }
        Ok(())
    }

    fn load_log(&self) -> io::Result<Vec<LogEntry>> {
        Ok(Self::read_json(&self.log_path())?.unwrap_or_default())
    }

    fn load_snapshot(&self) -> io::Result<Option<Snapshot>> {
        Self::read_json(&self.snapshot_path())
    }

    fn clear(&mut self) -> io::Result<()> {
        let _ = fs::remove_file(self.log_path());
        let _ = fs::remove_file(self.snapshot_path());
        Ok(())
    }
}

// -- in-memory storage implementation --

/// in-memory storage for testing
///
/// stores all state in memory, no persistence across restarts
#[derive(Default)]
pub struct InMemoryStorage {
    log: Vec<LogEntry>,
    snapshot: Option<Snapshot>,
}

impl InMemoryStorage {
    /// create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogStore for InMemoryStorage {
    fn save_entries(&mut self, entries: &[LogEntry]) -> io::Result<()> {
        merge_into(&mut self.log, entries);
        Ok(())
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        self.snapshot = Some(*snapshot);
        self.log.retain(|e| e.index > snapshot.index);
        Ok(())
    }

    fn load_log(&self) -> io::Result<Vec<LogEntry>> {
        Ok(self.log.clone())
    }

    fn load_snapshot(&self) -> io::Result<Option<Snapshot>> {
        Ok(self.snapshot)
    }

    fn clear(&mut self) -> io::Result<()> {
        self.log.clear();
        self.snapshot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn in_memory_storage_appends_and_loads_log() {
        let mut storage = InMemoryStorage::new();

        let entries = vec![
            LogEntry::new(1, 1, vec![1, 2, 3]),
            LogEntry::new(1, 2, vec![4, 5, 6]),
        ];
        storage.save_entries(&entries).unwrap();

        let log = storage.load_log().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].index, 1);
        assert_eq!(log[1].index, 2);
    }

    #[test]
    fn in_memory_storage_replaces_rewritten_tail() {
        let mut storage = InMemoryStorage::new();

        storage
            .save_entries(&[
                LogEntry::new(1, 1, vec![1]),
                LogEntry::new(1, 2, vec![2]),
                LogEntry::new(1, 3, vec![3]),
            ])
            .unwrap();
        storage.save_entries(&[LogEntry::new(2, 2, vec![9])]).unwrap();

        let log = storage.load_log().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].term, 2);
    }

    #[test]
    fn file_storage_appends_and_loads_log() {
        let dir = tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path()).unwrap();

        let entries = vec![
            LogEntry::new(1, 1, b"set key1 value1".to_vec()),
            LogEntry::new(1, 2, b"set key2 value2".to_vec()),
        ];
        storage.save_entries(&entries).unwrap();

        let log = storage.load_log().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].command, b"set key1 value1".to_vec());
    }

    #[test]
    fn file_storage_snapshot_drops_covered_entries() {
        let dir = tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path()).unwrap();

        storage
            .save_entries(&[
                LogEntry::new(1, 1, vec![1]),
                LogEntry::new(2, 2, vec![2]),
                LogEntry::new(3, 3, vec![3]),
            ])
            .unwrap();
        storage.save_snapshot(&Snapshot::new(2, 2)).unwrap();

        let log = storage.load_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].index, 3);
        assert_eq!(storage.load_snapshot().unwrap(), Some(Snapshot::new(2, 2)));
    }

    #[test]
    fn persist_reports_last_saved_entry() {
        let mut window = LogWindow::new(0);
        window
            .merge(&[LogEntry::new(1, 1, vec![1]), LogEntry::new(2, 2, vec![2])])
            .unwrap();
        let mut storage = InMemoryStorage::new();

        let cu = persist(&window, &mut storage).unwrap();

        assert_eq!(cu.stable_log_to, 2);
        assert_eq!(cu.stable_log_term, 2);
        assert_eq!(cu.stable_snapshot_to, 0);
    }
}
