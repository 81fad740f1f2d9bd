//! Vault-relative path handling
//!
//! Target paths come from user-edited mapping tables, so they are validated
//! before they ever reach the filesystem: they must stay inside the vault.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A validated path relative to the vault root.
///
/// Internally uses forward slashes with `.` segments and duplicate
/// separators collapsed. Absolute paths, drive prefixes and `..` segments are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VaultPath {
    inner: String,
}

impl VaultPath {
    /// Validate and normalize a vault-relative path.
    pub fn new(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("path is empty"));
        }
        if trimmed.contains('\0') {
            return Err(invalid("path contains a NUL byte"));
        }

        let unified = trimmed.replace('\\', "/");
        if unified.starts_with('/') {
            return Err(invalid("path must be relative to the vault root"));
        }
        let bytes = unified.as_bytes();
        if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
            return Err(invalid("drive prefixes are not allowed"));
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(invalid("path escapes the vault root")),
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            return Err(invalid("path has no file name"));
        }

        Ok(Self {
            inner: segments.join("/"),
        })
    }

    /// Get the normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Resolve to a native path under `root`.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        self.inner.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s))
    }

    /// Get the file name component.
    pub fn file_name(&self) -> &str {
        self.inner.rsplit('/').next().unwrap_or(&self.inner)
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        let idx = name.rfind('.')?;
        if idx == 0 { None } else { Some(&name[idx + 1..]) }
    }
}

impl fmt::Display for VaultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl AsRef<str> for VaultPath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}
