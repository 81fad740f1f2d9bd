//! Pure direction decision
//!
//! Detection works in two stages. [`detect_changes`] compares current mtimes
//! with the record's watermarks. The engine then confirms each candidate
//! side against its stored fingerprint and feeds the confirmed flags to
//! [`decide`].

use crate::model::{SyncDirection, SyncRecord};
use crate::time::{MtimeTolerance, Timestamp};

/// What to do with one mapping this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Sync(SyncDirection),
    Unchanged,
    Conflict,
}

/// Sides whose mtime passed its watermark by more than the tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MtimeChanges {
    pub doc: bool,
    pub file: bool,
    pub file_missing: bool,
}

impl MtimeChanges {
    pub fn any(&self) -> bool {
        self.doc || self.file
    }
}

/// Compare current mtimes to the record's watermarks.
///
/// A side without a watermark counts as changed. A missing file never does.
pub fn detect_changes(
    record: &SyncRecord,
    doc_modified: Timestamp,
    file_modified: Option<Timestamp>,
    tolerance: MtimeTolerance,
) -> MtimeChanges {
    let passed = |current: Timestamp, watermark: Option<Timestamp>| match watermark {
        Some(watermark) => tolerance.exceeds(current, watermark),
        None => true,
    };

    MtimeChanges {
        doc: passed(doc_modified, record.last_synced_doc_mtime),
        file: file_modified.is_some_and(|m| passed(m, record.last_synced_file_mtime)),
        file_missing: file_modified.is_none(),
    }
}

/// Infer the direction from confirmed changes.
///
/// Without a record the document is authoritative. A missing vault file is
/// recreated from the document.
pub fn decide(
    record: Option<&SyncRecord>,
    doc_changed: bool,
    file_changed: bool,
    file_missing: bool,
) -> Decision {
    if record.is_none() || file_missing {
        return Decision::Sync(SyncDirection::DocToFile);
    }
    match (doc_changed, file_changed) {
        (true, false) => Decision::Sync(SyncDirection::DocToFile),
        (false, true) => Decision::Sync(SyncDirection::FileToDoc),
        (false, false) => Decision::Unchanged,
        (true, true) => Decision::Conflict,
    }
}
