//! SyncEngine implementation
//!
//! The engine runs one cycle over a list of mappings. Each mapping is
//! processed independently: adapter and mapping failures become report
//! entries, only a failure to persist the state aborts the cycle.

use std::collections::HashSet;

use tracing::{debug, error, info, warn};
use vaultsync_content::{DocsMarkdownConverter, FormatConverter};
use vaultsync_fs::{VaultPath, fingerprint_bytes, fingerprint_text};

use crate::adapters::{
    AdapterError, DocumentStore, FileStore, LocalDocumentStore, LocalFileStore,
};
use crate::config::SyncConfig;
use crate::conflict::{ConflictLog, snapshot_hint};
use crate::model::{ConflictEntry, Mapping, Resolution, SyncDirection, SyncRecord};
use crate::state::SyncStateStore;
use crate::sync::decision::{Decision, decide, detect_changes};
use crate::sync::report::{CycleReport, MappingOutcome};
use crate::time::{Clock, MtimeTolerance, SystemClock, Timestamp};
use crate::{Error, Result};

/// Modification times read at the start of a mapping. Watermarks are always
/// set from these, never from times observed after a write.
#[derive(Debug, Clone, Copy)]
struct Observed {
    doc: Timestamp,
    file: Option<Timestamp>,
}

/// Engine for synchronizing documents with vault files
///
/// Owns the state store and the conflict log; both stores and the converter
/// are injected so tests can swap in fakes.
pub struct SyncEngine {
    documents: Box<dyn DocumentStore>,
    files: Box<dyn FileStore>,
    converter: Box<dyn FormatConverter>,
    state: SyncStateStore,
    conflicts: ConflictLog,
    clock: Box<dyn Clock>,
    tolerance: MtimeTolerance,
}

impl SyncEngine {
    pub fn new(
        documents: Box<dyn DocumentStore>,
        files: Box<dyn FileStore>,
        converter: Box<dyn FormatConverter>,
        state: SyncStateStore,
        conflicts: ConflictLog,
    ) -> Self {
        Self {
            documents,
            files,
            converter,
            state,
            conflicts,
            clock: Box::new(SystemClock),
            tolerance: MtimeTolerance::default(),
        }
    }

    /// Engine over the local adapters described by `config`.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            Box::new(LocalDocumentStore::new(&config.documents.root)),
            Box::new(LocalFileStore::new(&config.vault.root)),
            Box::new(DocsMarkdownConverter::new()),
            SyncStateStore::load(&config.state_file),
            ConflictLog::open(&config.conflict_log),
        )
        .with_tolerance(config.tolerance())
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_tolerance(mut self, tolerance: MtimeTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn state(&self) -> &SyncStateStore {
        &self.state
    }

    pub fn conflicts(&self) -> &ConflictLog {
        &self.conflicts
    }

    /// Run one cycle over `mappings`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the state store cannot be saved. Progress
    /// made by earlier mappings in the cycle is already on disk.
    pub fn run_cycle(&mut self, mappings: &[Mapping]) -> Result<CycleReport> {
        let mut report = CycleReport::new(self.clock.now());
        let mut seen = HashSet::new();

        for mapping in mappings {
            let outcome = match self.sync_mapping(mapping, &mut seen) {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(
                        document_id = %mapping.document_id,
                        target_path = %mapping.target_path,
                        error = %e,
                        "Mapping failed"
                    );
                    MappingOutcome::Error(e.to_string())
                }
            };
            debug!(target_path = %mapping.target_path, %outcome, "Mapping processed");
            report.push(&mapping.document_id, &mapping.target_path, outcome);
        }

        report.finished_at = self.clock.now();
        self.state.set_last_run(report.finished_at);
        self.state.save()?;
        Ok(report)
    }

    /// Settle a conflict on `mapping` in favour of one side.
    ///
    /// The discarded side's watermark and fingerprint move to what it holds
    /// now and the kept side's are cleared, so the next cycle sees only the
    /// kept side as changed and syncs it over. Nothing is written to either
    /// store here.
    pub fn resolve(&mut self, mapping: &Mapping, keep: Resolution) -> Result<SyncDirection> {
        let path = target_of(mapping)?;
        let document_id = mapping.document_id.as_str();
        let mut record = match self.state.get(path.as_str()) {
            Some(record) if record.document_id == document_id => record.clone(),
            _ => {
                return Err(Error::mapping(format!(
                    "no sync record for '{path}' from document '{document_id}'"
                )));
            }
        };

        match keep {
            Resolution::KeepDocument => {
                if let Some(meta) = self.files.metadata(&path)? {
                    record.last_synced_file_mtime = Some(meta.modified);
                    record.file_fingerprint =
                        self.files.read_content(&path)?.map(|b| fingerprint_bytes(&b));
                }
                record.last_synced_doc_mtime = None;
                record.doc_fingerprint = None;
            }
            Resolution::KeepFile => {
                if self.files.metadata(&path)?.is_none() {
                    return Err(AdapterError::file_not_found(path.as_str()).into());
                }
                let modified = self.documents.metadata(document_id)?.modified;
                let text = self.export_text(document_id)?;
                record.last_synced_doc_mtime = Some(modified);
                record.doc_fingerprint = Some(fingerprint_text(&text));
                record.last_synced_file_mtime = None;
                record.file_fingerprint = None;
            }
        }

        self.commit(record)?;
        let direction = keep.direction();
        info!(
            document_id = %document_id,
            target_path = %path,
            %direction,
            "Conflict resolved by hand"
        );
        Ok(direction)
    }

    fn sync_mapping(
        &mut self,
        mapping: &Mapping,
        seen: &mut HashSet<VaultPath>,
    ) -> Result<MappingOutcome> {
        let path = target_of(mapping)?;
        if !seen.insert(path.clone()) {
            return Err(Error::mapping(format!(
                "duplicate target path '{path}' in this configuration"
            )));
        }

        let document_id = mapping.document_id.as_str();
        let observed = Observed {
            doc: self.documents.metadata(document_id)?.modified,
            file: self.files.metadata(&path)?.map(|m| m.modified),
        };

        let record = match self.state.get(path.as_str()) {
            Some(record) if record.document_id == document_id => record.clone(),
            Some(record) => {
                info!(
                    target_path = %path,
                    old = %record.document_id,
                    new = %document_id,
                    "Target remapped to another document, treating as first sync"
                );
                return self.pull(mapping, &path, observed, None);
            }
            None => {
                debug!(target_path = %path, "No sync record, first sync");
                return self.pull(mapping, &path, observed, None);
            }
        };

        let changes = detect_changes(&record, observed.doc, observed.file, self.tolerance);

        // A side whose mtime moved but whose content matches the stored
        // fingerprint was only touched.
        let mut doc_changed = changes.doc;
        let mut doc_text = None;
        if changes.doc
            && let Some(known) = &record.doc_fingerprint
        {
            let text = self.export_text(document_id)?;
            doc_changed = fingerprint_text(&text) != *known;
            doc_text = Some(text);
        }

        let mut file_changed = changes.file;
        let mut file_bytes = None;
        if changes.file
            && let Some(known) = &record.file_fingerprint
            && let Some(bytes) = self.files.read_content(&path)?
        {
            file_changed = fingerprint_bytes(&bytes) != *known;
            file_bytes = Some(bytes);
        }

        let decision = decide(Some(&record), doc_changed, file_changed, changes.file_missing);
        debug!(
            target_path = %path,
            doc_changed,
            file_changed,
            file_missing = changes.file_missing,
            ?decision,
            "Direction decided"
        );

        match decision {
            Decision::Sync(SyncDirection::DocToFile) => {
                self.pull(mapping, &path, observed, doc_text)
            }
            Decision::Sync(SyncDirection::FileToDoc) => {
                self.push(mapping, &path, observed, file_bytes)
            }
            Decision::Conflict => {
                self.report_conflict(mapping, &path, &record, observed, doc_text, file_bytes)
            }
            Decision::Sync(SyncDirection::None) | Decision::Unchanged => {
                if changes.any() {
                    self.fast_forward(record, observed, changes.doc, changes.file)?;
                }
                Ok(MappingOutcome::Unchanged)
            }
        }
    }

    /// Document to file.
    fn pull(
        &mut self,
        mapping: &Mapping,
        path: &VaultPath,
        observed: Observed,
        text: Option<String>,
    ) -> Result<MappingOutcome> {
        let text = match text {
            Some(text) => text,
            None => self.export_text(&mapping.document_id)?,
        };
        self.files.write_content(path, text.as_bytes())?;

        let fingerprint = fingerprint_text(&text);
        self.commit(SyncRecord {
            target_path: path.as_str().to_string(),
            document_id: mapping.document_id.clone(),
            last_synced_doc_mtime: Some(observed.doc),
            // A file created by this write has no prior mtime; the
            // document's stands in.
            last_synced_file_mtime: Some(observed.file.unwrap_or(observed.doc)),
            last_sync_time: self.clock.now(),
            last_sync_direction: SyncDirection::DocToFile,
            doc_fingerprint: Some(fingerprint.clone()),
            file_fingerprint: Some(fingerprint),
        })?;

        info!(
            document_id = %mapping.document_id,
            target_path = %path,
            bytes = text.len(),
            "Synced document to file"
        );
        Ok(MappingOutcome::Synced(SyncDirection::DocToFile))
    }

    /// File to document.
    fn push(
        &mut self,
        mapping: &Mapping,
        path: &VaultPath,
        observed: Observed,
        bytes: Option<Vec<u8>>,
    ) -> Result<MappingOutcome> {
        let bytes = match bytes {
            Some(bytes) => bytes,
            None => self
                .files
                .read_content(path)?
                .ok_or_else(|| AdapterError::file_not_found(path.as_str()))?,
        };
        let text = String::from_utf8(bytes).map_err(vaultsync_content::Error::from)?;
        let payload = self.converter.to_source_format(&text)?;
        self.documents.update_content(&mapping.document_id, &payload)?;

        // Fingerprint what the document now exports, so the mtime bump from
        // this update is recognised as an echo next cycle.
        let doc_fingerprint = match self.export_text(&mapping.document_id) {
            Ok(exported) => Some(fingerprint_text(&exported)),
            Err(e) => {
                warn!(
                    document_id = %mapping.document_id,
                    error = %e,
                    "Could not re-export updated document; it will be pulled again"
                );
                None
            }
        };

        self.commit(SyncRecord {
            target_path: path.as_str().to_string(),
            document_id: mapping.document_id.clone(),
            last_synced_doc_mtime: Some(observed.doc),
            last_synced_file_mtime: observed.file,
            last_sync_time: self.clock.now(),
            last_sync_direction: SyncDirection::FileToDoc,
            doc_fingerprint,
            file_fingerprint: Some(fingerprint_text(&text)),
        })?;

        info!(
            document_id = %mapping.document_id,
            target_path = %path,
            chars = payload.len(),
            "Synced file to document"
        );
        Ok(MappingOutcome::Synced(SyncDirection::FileToDoc))
    }

    /// Record a conflict. No side is written and the record stays as is,
    /// unless both sides turn out to hold the same content.
    fn report_conflict(
        &mut self,
        mapping: &Mapping,
        path: &VaultPath,
        record: &SyncRecord,
        observed: Observed,
        doc_text: Option<String>,
        file_bytes: Option<Vec<u8>>,
    ) -> Result<MappingOutcome> {
        // A conflict implies the file exists.
        let file_mtime = observed.file.unwrap_or(observed.doc);
        if self.conflicts.contains(path.as_str(), observed.doc, file_mtime) {
            warn!(
                document_id = %mapping.document_id,
                target_path = %path,
                "Conflict still unresolved"
            );
            return Ok(MappingOutcome::Conflict);
        }

        let doc_text = match doc_text {
            Some(text) => Ok(text),
            None => self.export_text(&mapping.document_id),
        };
        let file_bytes = match file_bytes {
            Some(bytes) => Ok(Some(bytes)),
            None => self.files.read_content(path),
        };

        // Both sides moved to the same content: an interrupted flush of our
        // own write, or a conflict settled by hand.
        if let (Ok(text), Ok(Some(bytes))) = (&doc_text, &file_bytes)
            && fingerprint_bytes(bytes) == fingerprint_text(text)
        {
            info!(
                document_id = %mapping.document_id,
                target_path = %path,
                "Both sides hold the same content, syncing instead of a conflict"
            );
            let text = text.clone();
            return self.pull(mapping, path, observed, Some(text));
        }

        warn!(
            document_id = %mapping.document_id,
            target_path = %path,
            doc_mtime = %observed.doc,
            %file_mtime,
            "Conflict: both sides changed since last sync"
        );
        let doc_hint = match doc_text {
            Ok(text) => snapshot_hint(&text, &fingerprint_text(&text)),
            Err(e) => format!("unavailable: {e}"),
        };
        let file_hint = match file_bytes {
            Ok(Some(bytes)) => {
                snapshot_hint(&String::from_utf8_lossy(&bytes), &fingerprint_bytes(&bytes))
            }
            Ok(None) => "unavailable: file missing".to_string(),
            Err(e) => format!("unavailable: {e}"),
        };

        self.conflicts.record(&ConflictEntry {
            target_path: path.as_str().to_string(),
            document_id: mapping.document_id.clone(),
            doc_mtime: observed.doc,
            file_mtime,
            detected_at: self.clock.now(),
            last_synced_doc_mtime: record.last_synced_doc_mtime,
            last_synced_file_mtime: record.last_synced_file_mtime,
            doc_snapshot_hint: doc_hint,
            file_snapshot_hint: file_hint,
        });
        Ok(MappingOutcome::Conflict)
    }

    /// Move the watermarks of touched-but-identical sides forward.
    fn fast_forward(
        &mut self,
        mut record: SyncRecord,
        observed: Observed,
        doc_touched: bool,
        file_touched: bool,
    ) -> Result<()> {
        if doc_touched {
            record.last_synced_doc_mtime = Some(observed.doc);
        }
        if file_touched {
            record.last_synced_file_mtime = observed.file.or(record.last_synced_file_mtime);
        }
        debug!(target_path = %record.target_path, doc_touched, file_touched, "Watermarks fast-forwarded");
        self.commit(record)
    }

    fn commit(&mut self, record: SyncRecord) -> Result<()> {
        self.state.upsert(record);
        self.state.save()
    }

    fn export_text(&self, document_id: &str) -> Result<String> {
        let raw = self.documents.export_content(document_id)?;
        Ok(self.converter.to_plain_text(&raw)?)
    }
}

/// Validate a mapping and normalize its target path.
fn target_of(mapping: &Mapping) -> Result<VaultPath> {
    if mapping.document_id.trim().is_empty() {
        return Err(Error::mapping(format!(
            "document_id is empty for target '{}'",
            mapping.target_path
        )));
    }
    if mapping.target_path.trim().is_empty() {
        return Err(Error::mapping(format!(
            "target_path is empty for document '{}'",
            mapping.document_id
        )));
    }
    VaultPath::new(&mapping.target_path).map_err(|e| Error::mapping(e.to_string()))
}
