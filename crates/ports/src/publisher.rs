//! Publisher boundary contract (metric sink).

use std::fmt;
use std::time::Duration;
use tagscope_domain::Tags;

/// Failures raised by a publisher's lifecycle hooks.
///
/// These are caught and logged at the context-manager boundary and never
/// propagated to instrumented code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublisherError {
    /// The backend could not be opened for a new context.
    OpenFailed {
        /// Backend-specific failure description.
        reason: String,
    },
    /// The backend failed while flushing/closing a context.
    CloseFailed {
        /// Backend-specific failure description.
        reason: String,
    },
}

impl fmt::Display for PublisherError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed { reason } => write!(formatter, "publisher open failed: {reason}"),
            Self::CloseFailed { reason } => write!(formatter, "publisher close failed: {reason}"),
        }
    }
}

impl std::error::Error for PublisherError {}

/// Boundary contract for metric backends.
///
/// Implementations must be safe for concurrent calls; the engine shares one
/// publisher across all threads and never synchronizes access to it.
pub trait MetricPublisher: Send + Sync {
    /// Record a counter increment.
    fn increment(&self, name: &str, amount: u64, tags: &Tags);

    /// Record a finished duration for an operation.
    fn time(&self, name: &str, duration: Duration, tags: &Tags);

    /// Called when a metrics context becomes active. Default no-op.
    fn open(&self) -> Result<(), PublisherError> {
        Ok(())
    }

    /// Called when a metrics context becomes inactive. Default no-op.
    fn close(&self) -> Result<(), PublisherError> {
        Ok(())
    }
}

/// Publisher that discards every observation.
///
/// Used as the default when no backend is configured, and as the safety
/// fallback before declarative wiring has happened.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl MetricPublisher for NullPublisher {
    fn increment(&self, _name: &str, _amount: u64, _tags: &Tags) {}

    fn time(&self, _name: &str, _duration: Duration, _tags: &Tags) {}
}
