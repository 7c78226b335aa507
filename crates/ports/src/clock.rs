//! Millisecond clock port.
//!
//! Timing reads go through a trait so tests can drive deterministic
//! durations; production uses [`SystemClock`].

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of monotonically non-decreasing millisecond readings.
pub trait Clock: Send + Sync {
    /// Current reading in milliseconds.
    fn now_millis(&self) -> u64;
}

/// Wall-clock implementation reading epoch milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|duration| u64::try_from(duration.as_millis()).ok())
            .unwrap_or_default()
    }
}
