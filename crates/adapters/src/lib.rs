//! Publisher backends for the metrics ports.
//!
//! [`JsonLinesPublisher`] is the production backend: one JSON object per
//! metric event, written to a pluggable [`MetricSink`]. [`CapturePublisher`]
//! and [`FixedClock`] are deterministic doubles for tests.

pub mod capture;
pub mod json_lines;
pub mod sink;

pub use capture::{CaptureEvent, CapturePublisher, FixedClock};
pub use json_lines::JsonLinesPublisher;
pub use sink::{MetricSink, StderrSink};

/// Crate version, exposed for diagnostics.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
