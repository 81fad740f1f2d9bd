//! Data model shared by the engine, the state store and the conflict log

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Association between one source document and one vault file.
///
/// Loaded fresh from the mapping source every cycle and never mutated by the
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    #[serde(alias = "doc_id")]
    pub document_id: String,
    #[serde(alias = "vault_path")]
    pub target_path: String,
}

impl Mapping {
    pub fn new(document_id: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            target_path: target_path.into(),
        }
    }
}

/// Direction of the last completed sync for a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    DocToFile,
    FileToDoc,
    #[default]
    None,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocToFile => "doc_to_file",
            Self::FileToDoc => "file_to_doc",
            Self::None => "none",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side kept when a conflict is settled by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KeepDocument,
    KeepFile,
}

impl Resolution {
    /// Direction the next cycle syncs in.
    pub fn direction(self) -> SyncDirection {
        match self {
            Self::KeepDocument => SyncDirection::DocToFile,
            Self::KeepFile => SyncDirection::FileToDoc,
        }
    }
}

/// Per-target bookkeeping persisted between cycles.
///
/// The two mtimes are watermarks: the last observed and reconciled
/// modification time of each side. They only move together with a completed
/// write or a confirmed no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub target_path: String,
    pub document_id: String,
    pub last_synced_doc_mtime: Option<Timestamp>,
    pub last_synced_file_mtime: Option<Timestamp>,
    pub last_sync_time: Timestamp,
    #[serde(default)]
    pub last_sync_direction: SyncDirection,
    /// Fingerprint of the converted document text last reconciled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_fingerprint: Option<String>,
    /// Fingerprint of the file bytes last reconciled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_fingerprint: Option<String>,
}

/// A detected conflict: both sides changed since the last reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub target_path: String,
    pub document_id: String,
    pub doc_mtime: Timestamp,
    pub file_mtime: Timestamp,
    pub detected_at: Timestamp,
    #[serde(default)]
    pub last_synced_doc_mtime: Option<Timestamp>,
    #[serde(default)]
    pub last_synced_file_mtime: Option<Timestamp>,
    #[serde(default)]
    pub doc_snapshot_hint: String,
    #[serde(default)]
    pub file_snapshot_hint: String,
}
