//! Deterministic test doubles for the metrics ports.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tagscope_domain::Tags;
use tagscope_ports::{Clock, MetricPublisher, PublisherError};

/// A metric event observed by [`CapturePublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A counter increment.
    Increment {
        /// Metric name as published.
        name: String,
        /// Increment amount.
        amount: u64,
        /// Tags attached to the event.
        tags: Tags,
    },
    /// A timer sample.
    Time {
        /// Metric name as published.
        name: String,
        /// Measured duration.
        duration: Duration,
        /// Tags attached to the event.
        tags: Tags,
    },
}

#[derive(Default)]
struct CaptureState {
    events: Mutex<Vec<CaptureEvent>>,
    open_calls: AtomicUsize,
    close_calls: AtomicUsize,
    fail_on_open: AtomicBool,
    fail_on_close: AtomicBool,
}

/// Publisher double that records every event for assertions.
///
/// Clones share state, so a clone can be handed to the wiring while the
/// original stays in the test for inspection.
#[derive(Clone, Default)]
pub struct CapturePublisher {
    state: Arc<CaptureState>,
}

impl CapturePublisher {
    /// Create an empty capture publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events observed so far, in publish order.
    #[must_use]
    pub fn events(&self) -> Vec<CaptureEvent> {
        self.state
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Discard all recorded events and lifecycle counts.
    pub fn clear(&self) {
        self.state
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.state.open_calls.store(0, Ordering::SeqCst);
        self.state.close_calls.store(0, Ordering::SeqCst);
    }

    /// Number of `open` calls observed.
    #[must_use]
    pub fn open_calls(&self) -> usize {
        self.state.open_calls.load(Ordering::SeqCst)
    }

    /// Number of `close` calls observed.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.state.close_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent `open` calls fail.
    pub fn set_fail_on_open(&self, fail: bool) {
        self.state.fail_on_open.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `close` calls fail.
    pub fn set_fail_on_close(&self, fail: bool) {
        self.state.fail_on_close.store(fail, Ordering::SeqCst);
    }

    fn record(&self, event: CaptureEvent) {
        self.state
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl MetricPublisher for CapturePublisher {
    fn increment(&self, name: &str, amount: u64, tags: &Tags) {
        self.record(CaptureEvent::Increment {
            name: name.to_string(),
            amount,
            tags: tags.clone(),
        });
    }

    fn time(&self, name: &str, duration: Duration, tags: &Tags) {
        self.record(CaptureEvent::Time {
            name: name.to_string(),
            duration,
            tags: tags.clone(),
        });
    }

    fn open(&self) -> Result<(), PublisherError> {
        self.state.open_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_on_open.load(Ordering::SeqCst) {
            return Err(PublisherError::OpenFailed {
                reason: "capture publisher configured to fail".to_string(),
            });
        }
        Ok(())
    }

    fn close(&self) -> Result<(), PublisherError> {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_on_close.load(Ordering::SeqCst) {
            return Err(PublisherError::CloseFailed {
                reason: "capture publisher configured to fail".to_string(),
            });
        }
        Ok(())
    }
}

/// Clock double that advances by a fixed step on every read.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<AtomicU64>,
    step: u64,
}

impl FixedClock {
    /// Create a clock frozen at `start_millis`.
    #[must_use]
    pub fn new(start_millis: u64) -> Self {
        Self::with_step(start_millis, 0)
    }

    /// Create a clock starting at `start_millis` that advances by
    /// `step_millis` on every read.
    #[must_use]
    pub fn with_step(start_millis: u64, step_millis: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_millis)),
            step: step_millis,
        }
    }

    /// Advance the clock by `millis` without reading it.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_recorded_events() {
        let publisher = CapturePublisher::new();
        let clone = publisher.clone();

        clone.increment("orders", 2, &Tags::empty());

        let events = publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            CaptureEvent::Increment {
                name: "orders".to_string(),
                amount: 2,
                tags: Tags::empty(),
            },
        );
    }

    #[test]
    fn lifecycle_counters_and_failure_toggles() {
        let publisher = CapturePublisher::new();

        assert!(publisher.open().is_ok());
        publisher.set_fail_on_close(true);
        assert!(publisher.close().is_err());

        assert_eq!(publisher.open_calls(), 1);
        assert_eq!(publisher.close_calls(), 1);
    }

    #[test]
    fn fixed_clock_advances_by_step_per_read() {
        let clock = FixedClock::with_step(1_000, 25);
        assert_eq!(clock.now_millis(), 1_000);
        assert_eq!(clock.now_millis(), 1_025);

        clock.advance(100);
        assert_eq!(clock.now_millis(), 1_150);
    }
}
