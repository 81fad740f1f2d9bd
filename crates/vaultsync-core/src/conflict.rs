//! Conflict log
//!
//! An append-only JSON-lines file with one [`ConflictEntry`] per detected
//! conflict. Recording never fails the cycle: write errors are downgraded to
//! warnings. A standing conflict is only logged again when one of the two
//! mtimes moves. Entries are history; whether a target's latest conflict is
//! still pending is judged against the sync state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::warn;
use vaultsync_fs::io;

use crate::Result;
use crate::model::{ConflictEntry, SyncRecord};
use crate::state::SyncStateStore;
use crate::time::Timestamp;

/// Maximum characters of the excerpt in a snapshot hint.
const HINT_EXCERPT_CHARS: usize = 80;
/// Characters of the fingerprint kept in a snapshot hint, `sha256:` included.
const HINT_FINGERPRINT_CHARS: usize = 19;
/// Edits closer together than this are reported as simultaneous.
const SIMULTANEOUS_SECS: i64 = 60;

/// Append-only conflict log.
#[derive(Debug)]
pub struct ConflictLog {
    path: PathBuf,
    latest: HashMap<String, ConflictEntry>,
}

impl ConflictLog {
    /// Open the log at `path`, indexing existing entries for duplicate
    /// suppression. A missing file is an empty log.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut latest = HashMap::new();
        match load(&path) {
            Ok(entries) => {
                for entry in entries {
                    latest.insert(entry.target_path.clone(), entry);
                }
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Could not read conflict log"),
        }
        Self { path, latest }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the latest entry for `target_path` has exactly these mtimes.
    pub fn contains(&self, target_path: &str, doc_mtime: Timestamp, file_mtime: Timestamp) -> bool {
        self.latest
            .get(target_path)
            .is_some_and(|e| e.doc_mtime == doc_mtime && e.file_mtime == file_mtime)
    }

    /// Append `entry` unless it repeats the latest entry for its target.
    ///
    /// Returns true if a line was written.
    pub fn record(&mut self, entry: &ConflictEntry) -> bool {
        if self.contains(&entry.target_path, entry.doc_mtime, entry.file_mtime) {
            return false;
        }

        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                warn!(target_path = %entry.target_path, error = %e, "Could not serialize conflict entry");
                return false;
            }
        };
        match io::append_line(&self.path, &line) {
            Ok(()) => {
                self.latest.insert(entry.target_path.clone(), entry.clone());
                true
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    target_path = %entry.target_path,
                    error = %e,
                    "Could not append to conflict log"
                );
                false
            }
        }
    }

    /// All entries in the log, oldest first.
    pub fn entries(&self) -> Result<Vec<ConflictEntry>> {
        load(&self.path)
    }

    /// Latest entry of every target whose conflict is not settled yet,
    /// ordered by target path.
    pub fn pending(&self, state: &SyncStateStore) -> Vec<&ConflictEntry> {
        let mut pending: Vec<_> = self
            .latest
            .values()
            .filter(|entry| is_pending(entry, state.get(&entry.target_path)))
            .collect();
        pending.sort_by(|a, b| a.target_path.cmp(&b.target_path));
        pending
    }

    pub fn pending_count(&self, state: &SyncStateStore) -> usize {
        self.pending(state).len()
    }
}

/// A conflict is settled once the target was synced after it was detected,
/// or once the watermarks caught up with the conflicting mtimes.
fn is_pending(entry: &ConflictEntry, record: Option<&SyncRecord>) -> bool {
    let Some(record) = record else {
        return true;
    };
    if record.document_id != entry.document_id {
        return false;
    }
    let synced_since = record.last_sync_time > entry.detected_at;
    let caught_up = record.last_synced_doc_mtime >= Some(entry.doc_mtime)
        && record.last_synced_file_mtime >= Some(entry.file_mtime);
    !synced_since && !caught_up
}

/// Read a conflict log. Malformed lines are skipped with a warning.
pub fn load(path: &Path) -> Result<Vec<ConflictEntry>> {
    let mut entries = Vec::new();
    for (index, line) in io::read_lines(path)?.iter().enumerate() {
        match serde_json::from_str::<ConflictEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(
                path = %path.display(),
                line = index + 1,
                error = %e,
                "Skipping malformed conflict log line"
            ),
        }
    }
    Ok(entries)
}

/// Advisory text for resolving a conflict by hand.
pub fn suggest_resolution(entry: &ConflictEntry) -> String {
    let gap = entry.doc_mtime.signed_duration_since(entry.file_mtime);
    if gap.num_seconds().abs() < SIMULTANEOUS_SECS {
        return "Both sides were modified within a minute of each other; compare them and merge by hand"
            .to_string();
    }
    let minutes = gap.num_minutes().abs();
    if gap.num_seconds() > 0 {
        format!(
            "The document is newer by {minutes} minute(s); consider keeping the document version"
        )
    } else {
        format!("The file is newer by {minutes} minute(s); consider keeping the file version")
    }
}

/// Short description of one side's content: the first non-empty line,
/// truncated, and the fingerprint prefix.
pub fn snapshot_hint(text: &str, fingerprint: &str) -> String {
    let excerpt: String = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .chars()
        .take(HINT_EXCERPT_CHARS)
        .collect();
    let short: String = fingerprint.chars().take(HINT_FINGERPRINT_CHARS).collect();
    format!("{excerpt:?} [{short}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn entry(target: &str, doc_offset_secs: i64, file_offset_secs: i64) -> ConflictEntry {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        ConflictEntry {
            target_path: target.to_string(),
            document_id: "D1".to_string(),
            doc_mtime: base + Duration::seconds(doc_offset_secs),
            file_mtime: base + Duration::seconds(file_offset_secs),
            detected_at: base + Duration::hours(1),
            last_synced_doc_mtime: Some(base),
            last_synced_file_mtime: Some(base),
            doc_snapshot_hint: String::new(),
            file_snapshot_hint: String::new(),
        }
    }

    #[test]
    fn record_appends_and_dedupes_standing_conflicts() {
        let dir = TempDir::new().unwrap();
        let mut log = ConflictLog::open(dir.path().join("conflicts.log"));

        assert!(log.record(&entry("a.md", 10, 20)));
        assert!(!log.record(&entry("a.md", 10, 20)));
        assert!(log.record(&entry("a.md", 10, 30)));
        assert!(log.record(&entry("b.md", 10, 20)));

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 3);
        let state = SyncStateStore::load(dir.path().join("state.json"));
        assert_eq!(log.pending_count(&state), 2);
    }

    #[test]
    fn reopened_log_keeps_suppressing_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conflicts.log");
        ConflictLog::open(&path).record(&entry("a.md", 10, 20));

        let mut reopened = ConflictLog::open(&path);
        assert!(!reopened.record(&entry("a.md", 10, 20)));
        assert_eq!(reopened.entries().unwrap().len(), 1);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conflicts.log");
        let good = serde_json::to_string(&entry("a.md", 1, 2)).unwrap();
        std::fs::write(&path, format!("garbage\n{good}\n{{\"half\":\n")).unwrap();

        let entries = load(&path).unwrap();
        assert_eq!(entries, vec![entry("a.md", 1, 2)]);
    }

    #[test]
    fn write_failure_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let mut log = ConflictLog::open(blocker.join("conflicts.log"));
        assert!(!log.record(&entry("a.md", 1, 2)));
        let state = SyncStateStore::load(dir.path().join("state.json"));
        assert_eq!(log.pending_count(&state), 0);
    }

    fn record_for(entry: &ConflictEntry) -> SyncRecord {
        SyncRecord {
            target_path: entry.target_path.clone(),
            document_id: entry.document_id.clone(),
            last_synced_doc_mtime: entry.last_synced_doc_mtime,
            last_synced_file_mtime: entry.last_synced_file_mtime,
            last_sync_time: entry.detected_at - Duration::minutes(5),
            last_sync_direction: crate::model::SyncDirection::DocToFile,
            doc_fingerprint: None,
            file_fingerprint: None,
        }
    }

    #[test]
    fn standing_conflict_is_pending() {
        let conflict = entry("a.md", 10, 20);
        assert!(is_pending(&conflict, Some(&record_for(&conflict))));
        assert!(is_pending(&conflict, None));
    }

    #[test]
    fn conflict_is_settled_by_a_later_sync() {
        let conflict = entry("a.md", 10, 20);
        let mut record = record_for(&conflict);
        record.last_sync_time = conflict.detected_at + Duration::seconds(1);
        assert!(!is_pending(&conflict, Some(&record)));
    }

    #[test]
    fn conflict_is_settled_when_watermarks_catch_up() {
        let conflict = entry("a.md", 10, 20);
        let mut record = record_for(&conflict);
        record.last_synced_doc_mtime = Some(conflict.doc_mtime);
        record.last_synced_file_mtime = Some(conflict.file_mtime + Duration::seconds(30));
        assert!(!is_pending(&conflict, Some(&record)));

        record.last_synced_file_mtime = None;
        assert!(is_pending(&conflict, Some(&record)));
    }

    #[test]
    fn remapped_target_settles_the_conflict() {
        let conflict = entry("a.md", 10, 20);
        let mut record = record_for(&conflict);
        record.document_id = "D9".to_string();
        assert!(!is_pending(&conflict, Some(&record)));
    }

    #[test]
    fn pending_only_lists_unsettled_targets() {
        let dir = TempDir::new().unwrap();
        let mut log = ConflictLog::open(dir.path().join("conflicts.log"));
        let open = entry("a.md", 10, 20);
        let settled = entry("b.md", 10, 20);
        log.record(&open);
        log.record(&settled);

        let mut state = SyncStateStore::load(dir.path().join("state.json"));
        state.upsert(record_for(&open));
        let mut synced = record_for(&settled);
        synced.last_sync_time = settled.detected_at + Duration::minutes(1);
        state.upsert(synced);

        assert_eq!(log.pending(&state), vec![&open]);
        assert_eq!(log.pending_count(&state), 1);
    }

    #[test]
    fn suggestion_for_simultaneous_edits() {
        let text = suggest_resolution(&entry("a.md", 100, 130));
        assert!(text.contains("within a minute"));
    }

    #[test]
    fn suggestion_names_the_newer_side() {
        let doc_newer = suggest_resolution(&entry("a.md", 600, 0));
        assert!(doc_newer.contains("document is newer by 10 minute"));

        let file_newer = suggest_resolution(&entry("a.md", 0, 180));
        assert!(file_newer.contains("file is newer by 3 minute"));
    }

    #[test]
    fn snapshot_hint_uses_first_line_and_short_fingerprint() {
        let hint = snapshot_hint(
            "\n\n  # Weekly notes  \nbody",
            "sha256:0123456789abcdef0123456789abcdef",
        );
        assert_eq!(hint, r##""# Weekly notes" [sha256:0123456789ab]"##);
    }
}
