//! In-memory stores with failure injection.
//!
//! Both stores are cheap to clone and clones share state: hand one clone to
//! the engine and keep the other to arrange edits and inspect writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::TimeDelta;
use vaultsync_core::adapters::{
    AdapterError, AdapterResult, DocMetadata, DocumentStore, FileMetadata, FileStore,
    render_paragraphs,
};
use vaultsync_core::Timestamp;
use vaultsync_fs::VaultPath;

/// Mtime bump applied by a write when no write time is set.
fn default_write_bump() -> TimeDelta {
    TimeDelta::minutes(1)
}

/// An adapter failure to inject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    PermissionDenied,
    Timeout,
    Other(String),
}

impl Failure {
    fn to_error(&self, kind: &'static str, id: &str) -> AdapterError {
        match self {
            Self::NotFound => AdapterError::NotFound {
                kind,
                id: id.to_string(),
            },
            Self::PermissionDenied => AdapterError::PermissionDenied {
                id: id.to_string(),
                message: "injected".to_string(),
            },
            Self::Timeout => AdapterError::Timeout {
                operation: format!("accessing {id}"),
                seconds: 30,
            },
            Self::Other(message) => AdapterError::Other(message.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    content: T,
    modified: Timestamp,
}

#[derive(Debug, Default)]
struct DocState {
    docs: HashMap<String, Entry<String>>,
    metadata_failures: HashMap<String, Failure>,
    export_failures: HashMap<String, Failure>,
    update_failures: HashMap<String, Failure>,
    updates: Vec<(String, String)>,
    exports: usize,
    write_time: Option<Timestamp>,
}

/// Document store holding HTML exports in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<DocState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a document.
    pub fn insert(&self, id: &str, html: &str, modified: Timestamp) {
        self.state.lock().unwrap().docs.insert(
            id.to_string(),
            Entry {
                content: html.to_string(),
                modified,
            },
        );
    }

    /// Change only the modification time.
    pub fn touch(&self, id: &str, modified: Timestamp) {
        if let Some(doc) = self.state.lock().unwrap().docs.get_mut(id) {
            doc.modified = modified;
        }
    }

    pub fn html(&self, id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .docs
            .get(id)
            .map(|d| d.content.clone())
    }

    pub fn modified(&self, id: &str) -> Option<Timestamp> {
        self.state.lock().unwrap().docs.get(id).map(|d| d.modified)
    }

    /// Mtime assigned by subsequent updates.
    pub fn set_write_time(&self, at: Timestamp) {
        self.state.lock().unwrap().write_time = Some(at);
    }

    pub fn fail_metadata(&self, id: &str, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .metadata_failures
            .insert(id.to_string(), failure);
    }

    pub fn fail_export(&self, id: &str, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .export_failures
            .insert(id.to_string(), failure);
    }

    pub fn fail_update(&self, id: &str, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .update_failures
            .insert(id.to_string(), failure);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.metadata_failures.clear();
        state.export_failures.clear();
        state.update_failures.clear();
    }

    /// `(document_id, text)` of every successful update, in order.
    pub fn updates(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn export_count(&self) -> usize {
        self.state.lock().unwrap().exports
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn metadata(&self, document_id: &str) -> AdapterResult<DocMetadata> {
        let state = self.state.lock().unwrap();
        if let Some(failure) = state.metadata_failures.get(document_id) {
            return Err(failure.to_error("Document", document_id));
        }
        state
            .docs
            .get(document_id)
            .map(|d| DocMetadata {
                modified: d.modified,
            })
            .ok_or_else(|| AdapterError::document_not_found(document_id))
    }

    fn export_content(&self, document_id: &str) -> AdapterResult<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.export_failures.get(document_id) {
            return Err(failure.to_error("Document", document_id));
        }
        state.exports += 1;
        state
            .docs
            .get(document_id)
            .map(|d| d.content.clone().into_bytes())
            .ok_or_else(|| AdapterError::document_not_found(document_id))
    }

    fn update_content(&self, document_id: &str, text: &str) -> AdapterResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.update_failures.get(document_id) {
            return Err(failure.to_error("Document", document_id));
        }
        let write_time = state.write_time;
        let doc = state
            .docs
            .get_mut(document_id)
            .ok_or_else(|| AdapterError::document_not_found(document_id))?;
        doc.content = render_paragraphs(text);
        doc.modified = write_time.unwrap_or(doc.modified + default_write_bump());
        state
            .updates
            .push((document_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct FileState {
    files: HashMap<String, Entry<Vec<u8>>>,
    metadata_failures: HashMap<String, Failure>,
    write_failures: HashMap<String, Failure>,
    writes: Vec<String>,
    write_time: Option<Timestamp>,
}

/// Vault file store held in memory, keyed by normalized vault path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    state: Arc<Mutex<FileState>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, content: &str, modified: Timestamp) {
        self.state.lock().unwrap().files.insert(
            path.to_string(),
            Entry {
                content: content.as_bytes().to_vec(),
                modified,
            },
        );
    }

    pub fn touch(&self, path: &str, modified: Timestamp) {
        if let Some(file) = self.state.lock().unwrap().files.get_mut(path) {
            file.modified = modified;
        }
    }

    pub fn remove(&self, path: &str) {
        self.state.lock().unwrap().files.remove(path);
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|f| String::from_utf8_lossy(&f.content).into_owned())
    }

    pub fn modified(&self, path: &str) -> Option<Timestamp> {
        self.state.lock().unwrap().files.get(path).map(|f| f.modified)
    }

    /// Mtime assigned by subsequent writes.
    pub fn set_write_time(&self, at: Timestamp) {
        self.state.lock().unwrap().write_time = Some(at);
    }

    pub fn fail_metadata(&self, path: &str, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .metadata_failures
            .insert(path.to_string(), failure);
    }

    pub fn fail_write(&self, path: &str, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .write_failures
            .insert(path.to_string(), failure);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.metadata_failures.clear();
        state.write_failures.clear();
    }

    /// Paths of every successful write, in order.
    pub fn writes(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }
}

impl FileStore for MemoryFileStore {
    fn metadata(&self, path: &VaultPath) -> AdapterResult<Option<FileMetadata>> {
        let state = self.state.lock().unwrap();
        if let Some(failure) = state.metadata_failures.get(path.as_str()) {
            return Err(failure.to_error("File", path.as_str()));
        }
        Ok(state.files.get(path.as_str()).map(|f| FileMetadata {
            modified: f.modified,
        }))
    }

    fn read_content(&self, path: &VaultPath) -> AdapterResult<Option<Vec<u8>>> {
        let state = self.state.lock().unwrap();
        Ok(state.files.get(path.as_str()).map(|f| f.content.clone()))
    }

    fn write_content(&self, path: &VaultPath, content: &[u8]) -> AdapterResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.write_failures.get(path.as_str()) {
            return Err(failure.to_error("File", path.as_str()));
        }
        let modified = match (state.write_time, state.files.get(path.as_str())) {
            (Some(at), _) => at,
            (None, Some(existing)) => existing.modified + default_write_bump(),
            (None, None) => chrono::Utc::now(),
        };
        state.files.insert(
            path.as_str().to_string(),
            Entry {
                content: content.to_vec(),
                modified,
            },
        );
        state.writes.push(path.as_str().to_string());
        Ok(())
    }
}
