//! Change detection, direction inference and the sync cycle

pub mod decision;
mod engine;
mod report;

pub use decision::{Decision, MtimeChanges, decide, detect_changes};
pub use engine::SyncEngine;
pub use report::{CycleReport, CycleSummary, MappingOutcome, MappingReport};
