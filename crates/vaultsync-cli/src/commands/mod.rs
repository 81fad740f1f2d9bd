//! Command implementations for vaultsync-cli

pub mod conflicts;
pub mod resolve;
pub mod run;
pub mod status;

pub use conflicts::run_conflicts;
pub use resolve::run_resolve;
pub use run::run_sync;
pub use status::run_status;

use chrono::SecondsFormat;
use vaultsync_core::Timestamp;

/// Timestamps are shown to the second, in UTC.
fn format_time(at: Timestamp) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_optional_time(at: Option<Timestamp>) -> String {
    at.map(format_time).unwrap_or_else(|| "never".to_string())
}
