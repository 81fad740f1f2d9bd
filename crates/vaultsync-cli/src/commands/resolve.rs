//! Resolve command implementation

use colored::Colorize;
use vaultsync_core::{Resolution, SyncConfig, SyncEngine, find_mapping};

use crate::error::{CliError, Result};

/// Run the resolve command
pub fn run_resolve(config: &SyncConfig, target: &str, keep: Resolution) -> Result<()> {
    let mappings = config.mapping_source().load()?;
    let mapping = find_mapping(&mappings, target)
        .ok_or_else(|| CliError::user(format!("No mapping targets '{target}'")))?;

    let mut engine = SyncEngine::from_config(config);
    let direction = engine.resolve(mapping, keep)?;

    let kept = match keep {
        Resolution::KeepDocument => "document",
        Resolution::KeepFile => "file",
    };
    println!(
        "{} {}: keeping the {} version",
        "Resolved".green().bold(),
        mapping.target_path,
        kept
    );
    println!(
        "  The next cycle syncs {}; run {} to apply it now.",
        direction.to_string().cyan(),
        "vaultsync run --once".cyan()
    );
    Ok(())
}
