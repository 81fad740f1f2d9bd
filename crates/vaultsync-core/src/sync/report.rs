//! Per-cycle reporting

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::model::SyncDirection;
use crate::time::Timestamp;

/// Result of processing one mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum MappingOutcome {
    Synced(SyncDirection),
    Conflict,
    Unchanged,
    Error(String),
}

impl MappingOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for MappingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced(direction) => write!(f, "synced:{direction}"),
            Self::Conflict => f.write_str("conflict"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::Error(detail) => write!(f, "error:{detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingReport {
    pub document_id: String,
    pub target_path: String,
    pub outcome: MappingOutcome,
}

/// Counters over a cycle's outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub success: usize,
    pub conflicts: usize,
    pub errors: usize,
    pub unchanged: usize,
}

/// Report of one full pass over the mappings. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub entries: Vec<MappingReport>,
}

impl CycleReport {
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            entries: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        document_id: impl Into<String>,
        target_path: impl Into<String>,
        outcome: MappingOutcome,
    ) {
        self.entries.push(MappingReport {
            document_id: document_id.into(),
            target_path: target_path.into(),
            outcome,
        });
    }

    pub fn summary(&self) -> CycleSummary {
        let mut summary = CycleSummary::default();
        for entry in &self.entries {
            match entry.outcome {
                MappingOutcome::Synced(_) => summary.success += 1,
                MappingOutcome::Conflict => summary.conflicts += 1,
                MappingOutcome::Unchanged => summary.unchanged += 1,
                MappingOutcome::Error(_) => summary.errors += 1,
            }
        }
        summary
    }

    /// True if every mapping was synced or unchanged.
    pub fn is_clean(&self) -> bool {
        let summary = self.summary();
        summary.errors == 0 && summary.conflicts == 0
    }

    /// Outcome of the first entry for `target_path`.
    pub fn outcome_for(&self, target_path: &str) -> Option<&MappingOutcome> {
        self.entries
            .iter()
            .find(|e| e.target_path == target_path)
            .map(|e| &e.outcome)
    }

    /// Emit the cycle summary.
    pub fn log(&self) {
        let summary = self.summary();
        let elapsed_ms = (self.finished_at - self.started_at).num_milliseconds();
        if self.is_clean() {
            info!(
                success = summary.success,
                unchanged = summary.unchanged,
                elapsed_ms,
                "Sync cycle complete"
            );
        } else {
            warn!(
                success = summary.success,
                unchanged = summary.unchanged,
                conflicts = summary.conflicts,
                errors = summary.errors,
                elapsed_ms,
                "Sync cycle complete with problems"
            );
        }
    }
}
