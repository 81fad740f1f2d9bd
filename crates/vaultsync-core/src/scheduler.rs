//! Polling scheduler
//!
//! [`Poller`] runs the first cycle immediately, then one cycle per interval
//! until a stop is requested. Sleeping goes through the [`Sleeper`] seam so
//! tests run without wall-clock delays.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::Result;
use crate::mapping::MappingSource;
use crate::sync::{CycleReport, SyncEngine};

/// Slice used by [`ThreadSleeper`] between stop checks.
const DEFAULT_SLEEP_SLICE: Duration = Duration::from_secs(1);

/// Shared stop flag, raised from a signal handler or another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Waits between cycles. Implementations should return early once `stop`
/// is raised.
pub trait Sleeper: Send {
    fn sleep(&mut self, duration: Duration, stop: &StopHandle);
}

/// Sleeps the current thread in short slices, checking the stop flag
/// between slices.
#[derive(Debug, Clone)]
pub struct ThreadSleeper {
    slice: Duration,
}

impl ThreadSleeper {
    pub fn new() -> Self {
        Self::with_slice(DEFAULT_SLEEP_SLICE)
    }

    pub fn with_slice(slice: Duration) -> Self {
        Self {
            slice: slice.max(Duration::from_millis(1)),
        }
    }
}

impl Default for ThreadSleeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration, stop: &StopHandle) {
        let deadline = Instant::now() + duration;
        while !stop.is_stop_requested() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(self.slice.min(deadline - now));
        }
    }
}

/// What a polling run did.
#[derive(Debug, Default)]
pub struct PollSummary {
    /// Cycles attempted, including ones skipped for a mapping source failure.
    pub cycles: usize,
    pub last_report: Option<CycleReport>,
}

/// Drives [`SyncEngine::run_cycle`] on an interval.
pub struct Poller {
    interval: Duration,
    sleeper: Box<dyn Sleeper>,
    max_cycles: Option<usize>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            sleeper: Box::new(ThreadSleeper::new()),
            max_cycles: None,
        }
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Stop after `cycles` cycles. Unlimited by default.
    pub fn with_max_cycles(mut self, cycles: usize) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until stopped.
    ///
    /// Mappings are re-read from `source` before every cycle; a source
    /// failure skips that cycle. A stop request lets the in-flight cycle
    /// finish and persist before returning.
    ///
    /// # Errors
    ///
    /// Returns the first fatal engine error (a state save failure).
    pub fn run(
        &mut self,
        engine: &mut SyncEngine,
        source: &dyn MappingSource,
        stop: &StopHandle,
    ) -> Result<PollSummary> {
        let mut summary = PollSummary::default();
        info!(
            interval_secs = self.interval.as_secs(),
            source = %source.describe(),
            "Starting sync loop"
        );

        while !stop.is_stop_requested() {
            match source.load() {
                Ok(mappings) => {
                    debug!(count = mappings.len(), "Loaded mappings");
                    let report = engine.run_cycle(&mappings)?;
                    report.log();
                    summary.last_report = Some(report);
                }
                Err(e) => error!(error = %e, "Could not load mappings, skipping cycle"),
            }
            summary.cycles += 1;

            if self.max_cycles.is_some_and(|max| summary.cycles >= max) || stop.is_stop_requested()
            {
                break;
            }
            self.sleeper.sleep(self.interval, stop);
        }

        info!(cycles = summary.cycles, "Sync loop stopped");
        Ok(summary)
    }
}
