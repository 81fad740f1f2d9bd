//! Content conversion for vaultsync
//!
//! Converts word-processor HTML exports into vault Markdown and vault
//! Markdown back into the plain text a document update accepts. Both
//! directions are lossy; both are deterministic for a given input.

pub mod error;
pub mod format;
pub mod html;
pub mod plain;

pub use error::{Error, Result};
pub use format::{DocsMarkdownConverter, FormatConverter};
