//! Status command implementation

use colored::Colorize;
use vaultsync_core::{ConflictLog, SyncConfig, SyncStateStore};

use super::{format_optional_time, format_time};
use crate::error::Result;

/// Run the status command
pub fn run_status(config: &SyncConfig, json: bool) -> Result<()> {
    let state = SyncStateStore::load(&config.state_file);
    let conflicts = ConflictLog::open(&config.conflict_log);

    if json {
        let records: Vec<_> = state.records().collect();
        let value = serde_json::json!({
            "state_file": state.path(),
            "last_run": state.last_run(),
            "tracked": state.len(),
            "pending_conflicts": conflicts.pending_count(&state),
            "records": records,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Sync Status".bold());
    println!();
    println!("{}:      {}", "State".dimmed(), state.path().display());
    println!("{}:   {}", "Last run".dimmed(), format_optional_time(state.last_run()));
    println!("{}:    {}", "Tracked".dimmed(), state.len());
    let pending = conflicts.pending_count(&state);
    let pending_text = if pending == 0 {
        "none".green()
    } else {
        format!("{pending} (see {})", "vaultsync conflicts".cyan()).yellow()
    };
    println!("{}:  {}", "Conflicts".dimmed(), pending_text);
    println!();

    println!("{}:", "Records".bold());
    if state.is_empty() {
        println!("  {} (run {} to sync)", "None".dimmed(), "vaultsync run --once".cyan());
    }
    for record in state.records() {
        println!(
            "  {} {} {} [{}] {}",
            record.target_path,
            "<-".dimmed(),
            record.document_id.cyan(),
            record.last_sync_direction,
            format_time(record.last_sync_time).dimmed()
        );
    }

    Ok(())
}
