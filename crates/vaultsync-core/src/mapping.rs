//! Mapping sources
//!
//! Exactly one source is authoritative per configuration. Sources are asked
//! for mappings at the start of every cycle, so edits to a table or an
//! environment variable take effect without a restart.

use std::path::PathBuf;

use tracing::debug;
use vaultsync_fs::VaultPath;

use crate::model::Mapping;
use crate::{Error, Result};

/// Default environment variable holding a mapping list.
pub const DEFAULT_MAPPINGS_VAR: &str = "CONFIG_MAPPINGS";

const DOC_ID_COLUMN: &str = "doc_id";
const VAULT_PATH_COLUMN: &str = "vault_path";

/// Resolves the current `(document_id, target_path)` pairs.
pub trait MappingSource: Send + Sync {
    /// Short human-readable description used in logs.
    fn describe(&self) -> String;

    fn load(&self) -> Result<Vec<Mapping>>;
}

/// Mappings listed inline in the configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticMappings {
    mappings: Vec<Mapping>,
}

impl StaticMappings {
    pub fn new(mappings: Vec<Mapping>) -> Self {
        Self { mappings }
    }
}

impl MappingSource for StaticMappings {
    fn describe(&self) -> String {
        format!("config ({} mappings)", self.mappings.len())
    }

    fn load(&self) -> Result<Vec<Mapping>> {
        Ok(self.mappings.clone())
    }
}

/// The mapping whose normalized target path equals `target`.
pub fn find_mapping<'a>(mappings: &'a [Mapping], target: &str) -> Option<&'a Mapping> {
    let wanted = VaultPath::new(target).ok()?;
    mappings
        .iter()
        .find(|m| VaultPath::new(&m.target_path).is_ok_and(|p| p == wanted))
}

type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// A JSON or YAML list of mappings in an environment variable.
pub struct EnvMappings {
    var: String,
    lookup: Box<EnvLookup>,
}

impl EnvMappings {
    /// Read `var` from the process environment.
    pub fn new(var: impl Into<String>) -> Self {
        Self::with_lookup(var, |key| std::env::var(key).ok())
    }

    pub fn with_lookup(
        var: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            var: var.into(),
            lookup: Box::new(lookup),
        }
    }

    fn failure(&self, message: impl Into<String>) -> Error {
        Error::MappingSource {
            name: self.describe(),
            message: message.into(),
        }
    }
}

impl MappingSource for EnvMappings {
    fn describe(&self) -> String {
        format!("env:{}", self.var)
    }

    fn load(&self) -> Result<Vec<Mapping>> {
        let raw = (self.lookup)(&self.var)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| self.failure("variable is not set"))?;
        parse_list(&raw).map_err(|message| self.failure(message))
    }
}

/// Parse a mapping list given as JSON (when it starts with `[`) or YAML.
pub fn parse_list(raw: &str) -> std::result::Result<Vec<Mapping>, String> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| format!("invalid JSON mapping list: {e}"))
    } else {
        serde_yaml::from_str(trimmed).map_err(|e| format!("invalid YAML mapping list: {e}"))
    }
}

/// A CSV or TSV export of a two-column table.
///
/// The header row must contain `doc_id` and `vault_path` (any case, any
/// column order). Rows with a blank cell in either column are skipped.
#[derive(Debug, Clone)]
pub struct TableMappings {
    path: PathBuf,
}

impl TableMappings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MappingSource for TableMappings {
    fn describe(&self) -> String {
        format!("table:{}", self.path.display())
    }

    fn load(&self) -> Result<Vec<Mapping>> {
        let content = vaultsync_fs::io::read_text(&self.path)?;
        parse_table(&content).map_err(|message| Error::MappingSource {
            name: self.describe(),
            message,
        })
    }
}

/// Parse table content. Tab-delimited if the header contains a tab,
/// comma-delimited otherwise.
pub fn parse_table(content: &str) -> std::result::Result<Vec<Mapping>, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or("table is empty")?;
    let delimiter = if header.contains('\t') { '\t' } else { ',' };

    let columns: Vec<String> = split_row(header, delimiter)
        .into_iter()
        .map(|c| c.trim().to_ascii_lowercase())
        .collect();
    let position = |name: &str| {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| format!("header is missing the '{name}' column"))
    };
    let doc_col = position(DOC_ID_COLUMN)?;
    let path_col = position(VAULT_PATH_COLUMN)?;

    let mut mappings = Vec::new();
    for (index, line) in lines.enumerate() {
        let cells = split_row(line, delimiter);
        let cell = |i: usize| cells.get(i).map(|c| c.trim()).unwrap_or("");
        let (doc_id, vault_path) = (cell(doc_col), cell(path_col));
        if doc_id.is_empty() || vault_path.is_empty() {
            debug!(row = index + 2, "Skipping table row with a blank cell");
            continue;
        }
        mappings.push(Mapping::new(doc_id, vault_path));
    }
    Ok(mappings)
}

/// Split one row, honouring double-quoted cells with `""` escapes.
fn split_row(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => cells.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    cells.push(current);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_row_handles_quotes() {
        assert_eq!(
            split_row(r#"D1,"01. Inbox, misc/a.md","say ""hi""""#, ','),
            vec!["D1", "01. Inbox, misc/a.md", r#"say "hi""#]
        );
    }

    #[test]
    fn split_row_keeps_trailing_empty_cell() {
        assert_eq!(split_row("a\t", '\t'), vec!["a", ""]);
    }
}
