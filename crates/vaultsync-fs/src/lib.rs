//! Filesystem primitives for vaultsync
//!
//! Provides crash-safe writes for the sync state, append-only line files for
//! the conflict log, content fingerprints, vault-relative path validation and
//! format-agnostic configuration loading.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::{fingerprint_bytes, fingerprint_text};
pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use path::VaultPath;
