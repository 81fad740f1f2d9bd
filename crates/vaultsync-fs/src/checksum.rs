//! SHA-256 content fingerprints
//!
//! Fingerprints use the canonical `sha256:<hex>` form and are stored in sync
//! records to tell a real edit apart from a bare mtime bump.

use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

/// Fingerprint raw bytes.
pub fn fingerprint_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Fingerprint text content.
pub fn fingerprint_text(content: &str) -> String {
    fingerprint_bytes(content.as_bytes())
}
