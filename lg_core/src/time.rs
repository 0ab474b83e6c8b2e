// ABOUTME: Utilities for working with times and timestamps.
// ABOUTME: Provides uptime arithmetic and monotonic timers for poll cycles.
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Current wall-clock time in UTC
pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds elapsed between `start` and `now`, clamped at zero
///
/// A start time in the future (clock skew between us and the platform)
/// yields zero rather than a negative uptime.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use lg_core::seconds_since;
///
/// let now = Utc::now();
/// assert_eq!(seconds_since(now - Duration::seconds(90), now), 90);
/// assert_eq!(seconds_since(now + Duration::seconds(5), now), 0);
/// ```
pub fn seconds_since(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from(now.signed_duration_since(start).num_seconds()).unwrap_or(0)
}

/// Unix timestamp in seconds, as exposed on gauges
pub fn unix_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

/// Create a monotonic duration measurer
pub struct MonotonicTimer {
    start: Instant,
}

impl MonotonicTimer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}
