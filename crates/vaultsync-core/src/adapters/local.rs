//! Filesystem-backed adapters
//!
//! `LocalDocumentStore` stands in for a remote word-processor: each document
//! is an HTML export at `<root>/<document_id>.html`. `LocalFileStore` is the
//! vault itself.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use vaultsync_fs::{VaultPath, io};

use super::{AdapterError, AdapterResult, DocMetadata, DocumentStore, FileMetadata, FileStore};
use crate::time::from_system_time;

/// Render plain text as the HTML body a document update produces: one
/// escaped `<p>` per non-empty line.
pub fn render_paragraphs(text: &str) -> String {
    let mut html = String::from("<html><body>");
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        html.push_str("<p>");
        html.push_str(&html_escape::encode_text(line));
        html.push_str("</p>");
    }
    html.push_str("</body></html>\n");
    html
}

/// Documents stored as HTML exports in a directory.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, document_id: &str) -> AdapterResult<PathBuf> {
        let valid = !document_id.is_empty()
            && !document_id.contains(['/', '\\', '\0'])
            && document_id != "."
            && document_id != "..";
        if !valid {
            return Err(AdapterError::Other(format!(
                "Invalid document id '{document_id}'"
            )));
        }
        Ok(self.root.join(format!("{document_id}.html")))
    }
}

impl DocumentStore for LocalDocumentStore {
    fn metadata(&self, document_id: &str) -> AdapterResult<DocMetadata> {
        let path = self.document_path(document_id)?;
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|e| map_io_error("Document", document_id, &path, e))?;
        Ok(DocMetadata {
            modified: from_system_time(modified),
        })
    }

    fn export_content(&self, document_id: &str) -> AdapterResult<Vec<u8>> {
        let path = self.document_path(document_id)?;
        fs::read(&path).map_err(|e| map_io_error("Document", document_id, &path, e))
    }

    fn update_content(&self, document_id: &str, text: &str) -> AdapterResult<()> {
        let path = self.document_path(document_id)?;
        if !path.is_file() {
            return Err(AdapterError::document_not_found(document_id));
        }
        io::write_atomic(&path, render_paragraphs(text).as_bytes())?;
        Ok(())
    }
}

/// Vault files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileStore for LocalFileStore {
    fn metadata(&self, path: &VaultPath) -> AdapterResult<Option<FileMetadata>> {
        let full = path.resolve(&self.root);
        match fs::metadata(&full).and_then(|m| m.modified()) {
            Ok(modified) => Ok(Some(FileMetadata {
                modified: from_system_time(modified),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io_error("File", path.as_str(), &full, e)),
        }
    }

    fn read_content(&self, path: &VaultPath) -> AdapterResult<Option<Vec<u8>>> {
        Ok(io::read_optional(&path.resolve(&self.root))?)
    }

    fn write_content(&self, path: &VaultPath, content: &[u8]) -> AdapterResult<()> {
        io::write_atomic(&path.resolve(&self.root), content)?;
        Ok(())
    }
}

fn map_io_error(kind: &'static str, id: &str, path: &Path, err: std::io::Error) -> AdapterError {
    match err.kind() {
        ErrorKind::NotFound => AdapterError::NotFound {
            kind,
            id: id.to_string(),
        },
        ErrorKind::PermissionDenied => AdapterError::PermissionDenied {
            id: id.to_string(),
            message: err.to_string(),
        },
        ErrorKind::TimedOut => AdapterError::Timeout {
            operation: format!("reading {}", path.display()),
            seconds: 0,
        },
        _ => AdapterError::Io(vaultsync_fs::Error::io(path, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn render_paragraphs_escapes_and_skips_blank_lines() {
        assert_eq!(
            render_paragraphs("Fish & chips\n\n<b>not bold</b>"),
            "<html><body><p>Fish &amp; chips</p><p>&lt;b&gt;not bold&lt;/b&gt;</p></body></html>\n"
        );
    }

    #[test]
    fn missing_document_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(dir.path());
        let err = store.metadata("nope").unwrap_err();
        assert!(matches!(err, AdapterError::NotFound { kind: "Document", .. }));
    }

    #[test]
    fn document_ids_cannot_escape_the_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(dir.path());
        assert!(matches!(store.metadata("../x"), Err(AdapterError::Other(_))));
        assert!(matches!(store.metadata(""), Err(AdapterError::Other(_))));
    }

    #[test]
    fn update_requires_existing_document() {
        let dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(dir.path());
        let err = store.update_content("D1", "text").unwrap_err();
        assert!(matches!(err, AdapterError::NotFound { .. }));

        fs::write(dir.path().join("D1.html"), "<p>old</p>").unwrap();
        store.update_content("D1", "new text").unwrap();
        let exported = store.export_content("D1").unwrap();
        assert!(String::from_utf8(exported).unwrap().contains("<p>new text</p>"));
    }

    #[test]
    fn file_store_reports_missing_as_none() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());
        let path = VaultPath::new("notes/a.md").unwrap();
        assert_eq!(store.metadata(&path).unwrap(), None);
        assert_eq!(store.read_content(&path).unwrap(), None);
    }

    #[test]
    fn file_store_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());
        let path = VaultPath::new("01. Inbox/deep/a.md").unwrap();
        store.write_content(&path, b"# Title\n").unwrap();

        assert!(store.metadata(&path).unwrap().is_some());
        assert_eq!(
            fs::read_to_string(dir.path().join("01. Inbox/deep/a.md")).unwrap(),
            "# Title\n"
        );
    }
}
