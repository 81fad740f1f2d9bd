//! Timestamps, change tolerance and the clock seam
//!
//! Every timestamp in the engine is a UTC [`Timestamp`]. Adapters convert
//! their native representation at the boundary.

use std::time::SystemTime;

use chrono::{DateTime, TimeDelta, Utc};

/// The single timestamp type used for mtimes, watermarks and wall-clock times.
pub type Timestamp = DateTime<Utc>;

/// Default slack allowed between a watermark and a current mtime.
pub const DEFAULT_MTIME_TOLERANCE_MS: u64 = 1_000;

/// How far past its watermark an mtime must be before a side counts as
/// changed.
///
/// Absorbs sub-second precision loss between stores. A change of exactly the
/// tolerance is not a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtimeTolerance(TimeDelta);

impl MtimeTolerance {
    pub const ZERO: Self = Self(TimeDelta::zero());

    pub fn from_millis(millis: u64) -> Self {
        let millis = i64::try_from(millis).unwrap_or(i64::MAX);
        Self(TimeDelta::try_milliseconds(millis).unwrap_or(TimeDelta::MAX))
    }

    pub fn as_delta(&self) -> TimeDelta {
        self.0
    }

    /// True if `current` is strictly later than `watermark + tolerance`.
    pub fn exceeds(&self, current: Timestamp, watermark: Timestamp) -> bool {
        match watermark.checked_add_signed(self.0) {
            Some(limit) => current > limit,
            None => false,
        }
    }
}

impl Default for MtimeTolerance {
    fn default() -> Self {
        Self::from_millis(DEFAULT_MTIME_TOLERANCE_MS)
    }
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Normalize a filesystem time to UTC.
pub fn from_system_time(time: SystemTime) -> Timestamp {
    DateTime::<Utc>::from(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn zero_tolerance_is_strict_greater_than() {
        assert!(MtimeTolerance::ZERO.exceeds(t(11), t(10)));
        assert!(!MtimeTolerance::ZERO.exceeds(t(10), t(10)));
        assert!(!MtimeTolerance::ZERO.exceeds(t(9), t(10)));
    }

    #[test]
    fn exactly_the_tolerance_is_not_a_change() {
        let tol = MtimeTolerance::from_millis(1_000);
        assert!(!tol.exceeds(t(11), t(10)));
        assert!(tol.exceeds(t(11) + TimeDelta::nanoseconds(1), t(10)));
    }

    #[test]
    fn default_tolerance_is_one_second() {
        assert_eq!(MtimeTolerance::default().as_delta(), TimeDelta::seconds(1));
    }

    #[test]
    fn huge_tolerance_does_not_overflow() {
        let tol = MtimeTolerance::from_millis(u64::MAX);
        assert!(!tol.exceeds(t(1_000_000), t(0)));
    }
}
