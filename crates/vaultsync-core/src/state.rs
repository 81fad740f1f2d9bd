//! Persisted sync state
//!
//! One JSON file maps each target path to its [`SyncRecord`]. The store is
//! loaded once at engine start and has exactly one writer. Saves are atomic
//! (temp file in the same directory, fsync, rename), so a crash leaves
//! either the previous or the new state on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vaultsync_fs::io;

use crate::model::SyncRecord;
use crate::time::Timestamp;
use crate::{Error, Result};

const STATE_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateFile {
    version: String,
    #[serde(default)]
    last_run: Option<Timestamp>,
    #[serde(default)]
    records: BTreeMap<String, SyncRecord>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            last_run: None,
            records: BTreeMap::new(),
        }
    }
}

/// Map of `target_path -> SyncRecord` backed by a JSON file.
#[derive(Debug)]
pub struct SyncStateStore {
    path: PathBuf,
    state: StateFile,
    dirty: bool,
}

impl SyncStateStore {
    /// Load the store from `path`.
    ///
    /// A missing file yields an empty store. So does a corrupt one, after a
    /// warning and a best-effort copy to `<path>.corrupt` so the next save
    /// does not destroy the evidence.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<StateFile>(&content) {
                Ok(state) => {
                    debug!(path = %path.display(), records = state.records.len(), "Loaded sync state");
                    state
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Sync state is corrupt, starting empty");
                    let backup = corrupt_backup_path(&path);
                    if let Err(e) = fs::copy(&path, &backup) {
                        warn!(path = %backup.display(), error = %e, "Could not back up corrupt state");
                    }
                    StateFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No sync state yet");
                StateFile::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read sync state, starting empty");
                StateFile::default()
            }
        };

        Self {
            path,
            state,
            dirty: false,
        }
    }

    /// Persist the store atomically. Clears the dirty flag on success.
    pub fn save(&mut self) -> Result<()> {
        let save_err = |source| Error::StateSave {
            path: self.path.clone(),
            source,
        };
        let mut content = serde_json::to_string_pretty(&self.state)?;
        content.push('\n');
        io::write_atomic(&self.path, content.as_bytes()).map_err(save_err)?;
        self.dirty = false;
        debug!(path = %self.path.display(), records = self.state.records.len(), "Saved sync state");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, target_path: &str) -> Option<&SyncRecord> {
        self.state.records.get(target_path)
    }

    /// Insert or replace the record for its target path.
    pub fn upsert(&mut self, record: SyncRecord) {
        self.state.records.insert(record.target_path.clone(), record);
        self.dirty = true;
    }

    /// Records ordered by target path.
    pub fn records(&self) -> impl Iterator<Item = &SyncRecord> {
        self.state.records.values()
    }

    pub fn len(&self) -> usize {
        self.state.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.records.is_empty()
    }

    /// Completion time of the last cycle.
    pub fn last_run(&self) -> Option<Timestamp> {
        self.state.last_run
    }

    pub fn set_last_run(&mut self, at: Timestamp) {
        self.state.last_run = Some(at);
        self.dirty = true;
    }

    /// True if there are changes not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyncDirection;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(target: &str) -> SyncRecord {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        SyncRecord {
            target_path: target.to_string(),
            document_id: "D1".to_string(),
            last_synced_doc_mtime: Some(t),
            last_synced_file_mtime: Some(t),
            last_sync_time: t,
            last_sync_direction: SyncDirection::DocToFile,
            doc_fingerprint: None,
            file_fingerprint: None,
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = SyncStateStore::load(dir.path().join("state.json"));
        assert!(store.is_empty());
        assert_eq!(store.last_run(), None);
        assert!(!store.is_dirty());
    }

    #[test]
    fn corrupt_file_loads_empty_and_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SyncStateStore::load(&path);
        assert!(store.is_empty());
        assert_eq!(
            fs::read_to_string(dir.path().join("state.json.corrupt")).unwrap(),
            "{ not json"
        );
    }

    #[test]
    fn upsert_marks_dirty_and_save_clears_it() {
        let dir = TempDir::new().unwrap();
        let mut store = SyncStateStore::load(dir.path().join("state.json"));
        store.upsert(record("a.md"));
        assert!(store.is_dirty());
        store.save().unwrap();
        assert!(!store.is_dirty());
    }

    #[test]
    fn save_then_load_preserves_records_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state.json");
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap();

        let mut store = SyncStateStore::load(&path);
        store.upsert(record("b.md"));
        store.upsert(record("a.md"));
        store.set_last_run(at);
        store.save().unwrap();

        let reloaded = SyncStateStore::load(&path);
        let targets: Vec<_> = reloaded.records().map(|r| r.target_path.as_str()).collect();
        assert_eq!(targets, vec!["a.md", "b.md"]);
        assert_eq!(reloaded.get("a.md"), Some(&record("a.md")));
        assert_eq!(reloaded.last_run(), Some(at));
    }

    #[test]
    fn save_failure_is_a_state_save_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let mut store = SyncStateStore::load(blocker.join("state.json"));
        store.upsert(record("a.md"));
        let err = store.save().unwrap_err();
        assert!(err.is_fatal());
        assert!(store.is_dirty());
    }
}
