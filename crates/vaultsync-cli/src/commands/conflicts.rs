//! Conflicts command implementation

use colored::Colorize;
use serde::Serialize;
use vaultsync_core::{ConflictEntry, ConflictLog, SyncConfig, SyncStateStore, suggest_resolution};

use super::{format_optional_time, format_time};
use crate::error::Result;

#[derive(Serialize)]
struct ConflictJson<'a> {
    #[serde(flatten)]
    entry: &'a ConflictEntry,
    pending: bool,
    suggestion: String,
}

/// Run the conflicts command
pub fn run_conflicts(config: &SyncConfig, json: bool) -> Result<()> {
    let log = ConflictLog::open(&config.conflict_log);
    let entries = log.entries()?;
    let state = SyncStateStore::load(&config.state_file);
    let pending = log.pending(&state);
    let is_pending = |entry: &ConflictEntry| pending.contains(&entry);

    if json {
        let items: Vec<_> = entries
            .iter()
            .map(|entry| ConflictJson {
                entry,
                pending: is_pending(entry),
                suggestion: suggest_resolution(entry),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No conflicts logged".green());
        return Ok(());
    }

    println!(
        "{} ({} logged, {} pending)",
        "Conflicts".bold(),
        entries.len(),
        pending.len()
    );
    for entry in &entries {
        println!();
        let status = if is_pending(entry) {
            "pending".yellow()
        } else {
            "closed".green()
        };
        println!(
            "  {} {} {} [{}]",
            entry.target_path.yellow().bold(),
            "<->".dimmed(),
            entry.document_id.cyan(),
            status
        );
        println!("    {}:  {}", "Detected".dimmed(), format_time(entry.detected_at));
        println!(
            "    {}:  {} (last synced {})",
            "Document".dimmed(),
            format_time(entry.doc_mtime),
            format_optional_time(entry.last_synced_doc_mtime)
        );
        println!(
            "    {}:      {} (last synced {})",
            "File".dimmed(),
            format_time(entry.file_mtime),
            format_optional_time(entry.last_synced_file_mtime)
        );
        println!("    {}: {}", "Doc hint".dimmed(), entry.doc_snapshot_hint);
        println!("    {}: {}", "File hint".dimmed(), entry.file_snapshot_hint);
        if is_pending(entry) {
            println!("    {} {}", "→".cyan(), suggest_resolution(entry));
            println!(
                "    {} vaultsync resolve {} --keep doc|file",
                "→".cyan(),
                entry.target_path
            );
        }
    }

    Ok(())
}
