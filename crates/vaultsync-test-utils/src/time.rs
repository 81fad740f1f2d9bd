//! Deterministic time for engine and scheduler tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};
use vaultsync_core::{Clock, Sleeper, StopHandle, Timestamp};

/// A fixed timestamp `secs` seconds after 2024-01-01T00:00:00Z.
pub fn ts(secs: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + TimeDelta::seconds(secs)
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: Timestamp) {
        *self.now.lock().unwrap() = at;
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

type SleepHook = Box<dyn FnMut(usize) + Send>;

#[derive(Default)]
struct SleeperState {
    sleeps: Vec<Duration>,
    stop_after: Option<usize>,
    hook: Option<SleepHook>,
}

/// Sleeper that records requested durations instead of sleeping.
///
/// Clones share the recorded sleeps, so a test keeps one clone and hands the
/// other to the poller.
#[derive(Clone, Default)]
pub struct ManualSleeper {
    state: Arc<Mutex<SleeperState>>,
}

impl ManualSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the stop flag on the `n`th sleep.
    pub fn stop_after(self, n: usize) -> Self {
        self.state.lock().unwrap().stop_after = Some(n);
        self
    }

    /// Run `hook(sleep_number)` on every sleep, before any stop check.
    pub fn on_sleep(self, hook: impl FnMut(usize) + Send + 'static) -> Self {
        self.state.lock().unwrap().hook = Some(Box::new(hook));
        self
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }
}

impl Sleeper for ManualSleeper {
    fn sleep(&mut self, duration: Duration, stop: &StopHandle) {
        let mut state = self.state.lock().unwrap();
        state.sleeps.push(duration);
        let count = state.sleeps.len();
        if let Some(hook) = state.hook.as_mut() {
            hook(count);
        }
        if state.stop_after.is_some_and(|n| count >= n) {
            stop.request_stop();
        }
    }
}
