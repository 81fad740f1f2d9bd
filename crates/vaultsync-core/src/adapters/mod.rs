//! Store adapters
//!
//! The engine only talks to the two sides through [`DocumentStore`] and
//! [`FileStore`]. Every adapter normalizes its native timestamps to UTC at
//! this boundary.

mod local;

use vaultsync_fs::VaultPath;

use crate::time::Timestamp;

pub use local::{LocalDocumentStore, LocalFileStore, render_paragraphs};

/// Result type for adapter calls
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// Errors reported by document and file stores
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Permission denied for {id}: {message}")]
    PermissionDenied { id: String, message: String },

    #[error("Timed out after {seconds}s while {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error(transparent)]
    Io(#[from] vaultsync_fs::Error),

    #[error("{0}")]
    Other(String),
}

impl AdapterError {
    pub fn document_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Document",
            id: id.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "File",
            id: path.into(),
        }
    }
}

/// Metadata of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocMetadata {
    pub modified: Timestamp,
}

/// Metadata of a vault file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub modified: Timestamp,
}

/// Word-processor side of a mapping.
pub trait DocumentStore: Send + Sync {
    fn metadata(&self, document_id: &str) -> AdapterResult<DocMetadata>;

    /// Raw export of the document, as fed to the format converter.
    fn export_content(&self, document_id: &str) -> AdapterResult<Vec<u8>>;

    /// Replace the document body with `text`.
    fn update_content(&self, document_id: &str, text: &str) -> AdapterResult<()>;
}

/// Vault side of a mapping. A missing file is `None`, not an error.
pub trait FileStore: Send + Sync {
    fn metadata(&self, path: &VaultPath) -> AdapterResult<Option<FileMetadata>>;

    fn read_content(&self, path: &VaultPath) -> AdapterResult<Option<Vec<u8>>>;

    fn write_content(&self, path: &VaultPath, content: &[u8]) -> AdapterResult<()>;
}
