//! Error types for vaultsync-core

use std::path::PathBuf;

use crate::adapters::AdapterError;

/// Result type for vaultsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vaultsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mapping is malformed (missing id, bad path, duplicate target)
    #[error("Invalid mapping: {message}")]
    Mapping { message: String },

    /// The configured mapping source could not produce mappings
    #[error("Mapping source {name} failed: {message}")]
    MappingSource { name: String, message: String },

    /// A document or file store call failed
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Source content could not be converted
    #[error("Conversion failed: {0}")]
    Conversion(#[from] vaultsync_content::Error),

    /// The sync state could not be persisted
    #[error("Failed to save sync state to {path}: {source}")]
    StateSave {
        path: PathBuf,
        #[source]
        source: vaultsync_fs::Error,
    },

    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Filesystem error from vaultsync-fs
    #[error(transparent)]
    Fs(#[from] vaultsync_fs::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Errors that must stop the polling loop instead of being isolated to
    /// one mapping.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StateSave { .. })
    }
}
