//! [`TestWorkspace`]: a temporary directory laid out for the local adapters.
//!
//! ```text
//! <tmp>/
//!   docs/<document_id>.html
//!   vault/...
//!   .sync_state.json
//!   conflicts.log
//!   config.yaml
//! ```

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("docs")).unwrap();
        fs::create_dir_all(temp_dir.path().join("vault")).unwrap();
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn docs_root(&self) -> PathBuf {
        self.root().join("docs")
    }

    pub fn vault_root(&self) -> PathBuf {
        self.root().join("vault")
    }

    pub fn state_file(&self) -> PathBuf {
        self.root().join(".sync_state.json")
    }

    pub fn conflict_log(&self) -> PathBuf {
        self.root().join("conflicts.log")
    }

    pub fn doc_path(&self, id: &str) -> PathBuf {
        self.docs_root().join(format!("{id}.html"))
    }

    pub fn vault_path(&self, path: &str) -> PathBuf {
        self.vault_root().join(path)
    }

    pub fn write_doc(&self, id: &str, html: &str) {
        fs::write(self.doc_path(id), html).unwrap();
    }

    pub fn read_doc(&self, id: &str) -> String {
        fs::read_to_string(self.doc_path(id)).unwrap()
    }

    pub fn write_vault(&self, path: &str, content: &str) {
        let full = self.vault_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    pub fn read_vault(&self, path: &str) -> Option<String> {
        fs::read_to_string(self.vault_path(path)).ok()
    }

    /// Set a document's mtime to `secs` seconds after the Unix epoch.
    pub fn set_doc_mtime(&self, id: &str, secs: u64) {
        set_mtime(&self.doc_path(id), secs);
    }

    /// Set a vault file's mtime to `secs` seconds after the Unix epoch.
    pub fn set_vault_mtime(&self, path: &str, secs: u64) {
        set_mtime(&self.vault_path(path), secs);
    }

    /// Write `config.yaml` pointing at this workspace with inline mappings.
    pub fn write_config(&self, mappings: &[(&str, &str)]) -> PathBuf {
        let mut yaml = format!(
            "sync_interval: 60\nstate_file: {}\nconflict_log: {}\ndocuments:\n  root: {}\nvault:\n  root: {}\nmappings:\n",
            quoted(&self.state_file()),
            quoted(&self.conflict_log()),
            quoted(&self.docs_root()),
            quoted(&self.vault_root()),
        );
        for (doc_id, vault_path) in mappings {
            yaml.push_str(&format!(
                "  - doc_id: \"{doc_id}\"\n    vault_path: \"{vault_path}\"\n"
            ));
        }
        let path = self.root().join("config.yaml");
        fs::write(&path, yaml).unwrap();
        path
    }
}

fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn quoted(path: &Path) -> String {
    format!("'{}'", path.display())
}
