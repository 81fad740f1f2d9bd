//! Run command implementation

use std::process::ExitCode;

use colored::Colorize;
use vaultsync_core::{CycleReport, MappingOutcome, Poller, StopHandle, SyncConfig, SyncEngine};

use crate::error::Result;
use crate::signal;

/// Exit status of a single cycle that ended with errors or conflicts.
const EXIT_CYCLE_PROBLEMS: u8 = 2;

/// Run the run command
pub fn run_sync(config: &SyncConfig, once: bool, json: bool) -> Result<ExitCode> {
    let mut engine = SyncEngine::from_config(config);
    let source = config.mapping_source();

    if once {
        let mappings = source.load()?;
        let report = engine.run_cycle(&mappings)?;
        report.log();
        if json {
            println!("{}", serde_json::to_string_pretty(&ReportJson::from(&report))?);
        } else {
            print_report(&report);
        }
        return Ok(if report.is_clean() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(EXIT_CYCLE_PROBLEMS)
        });
    }

    let stop = StopHandle::new();
    signal::install(stop.clone())?;
    let summary = Poller::new(config.interval()).run(&mut engine, source.as_ref(), &stop)?;
    println!(
        "{} after {} cycle(s)",
        "Stopped".green().bold(),
        summary.cycles
    );
    Ok(ExitCode::SUCCESS)
}

#[derive(serde::Serialize)]
struct ReportJson<'a> {
    #[serde(flatten)]
    report: &'a CycleReport,
    summary: vaultsync_core::CycleSummary,
}

impl<'a> From<&'a CycleReport> for ReportJson<'a> {
    fn from(report: &'a CycleReport) -> Self {
        Self {
            report,
            summary: report.summary(),
        }
    }
}

fn print_report(report: &CycleReport) {
    let summary = report.summary();
    let headline = format!(
        "{} synced, {} unchanged, {} conflict(s), {} error(s)",
        summary.success, summary.unchanged, summary.conflicts, summary.errors
    );
    if report.is_clean() {
        println!("{} {}", "Cycle complete:".green().bold(), headline);
    } else {
        println!("{} {}", "Cycle complete:".yellow().bold(), headline);
    }

    for entry in &report.entries {
        let outcome = entry.outcome.to_string();
        let outcome = match entry.outcome {
            MappingOutcome::Synced(_) => outcome.green(),
            MappingOutcome::Unchanged => outcome.dimmed(),
            MappingOutcome::Conflict => outcome.yellow(),
            MappingOutcome::Error(_) => outcome.red(),
        };
        println!(
            "  {} {} {} {}",
            entry.document_id.cyan(),
            "->".dimmed(),
            entry.target_path,
            outcome
        );
    }
}
