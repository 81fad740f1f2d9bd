//! Converter seam used by the sync engine

use crate::{Result, html, plain};

/// Converts between a document store's export format and vault text.
///
/// Implementations must be deterministic: the same input always yields the
/// same output. The engine relies on that to fingerprint converted content.
pub trait FormatConverter: Send + Sync {
    /// Convert raw export bytes to the text written into the vault.
    fn to_plain_text(&self, raw_export: &[u8]) -> Result<String>;

    /// Convert vault text to the payload accepted by a document update.
    fn to_source_format(&self, text: &str) -> Result<String>;
}

/// Converter for word-processor HTML exports and Obsidian-flavoured Markdown.
#[derive(Debug, Default, Clone)]
pub struct DocsMarkdownConverter;

impl DocsMarkdownConverter {
    pub fn new() -> Self {
        Self
    }
}

impl FormatConverter for DocsMarkdownConverter {
    fn to_plain_text(&self, raw_export: &[u8]) -> Result<String> {
        let source = String::from_utf8(raw_export.to_vec())?;
        let markdown = html::html_to_markdown(&source);
        tracing::debug!(bytes = raw_export.len(), "Converted HTML export to Markdown");
        Ok(markdown)
    }

    fn to_source_format(&self, text: &str) -> Result<String> {
        let plain = plain::markdown_to_plain_text(text);
        tracing::debug!(chars = plain.len(), "Converted Markdown to plain text");
        Ok(plain)
    }
}
