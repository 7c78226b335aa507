//! # tagscope-ports
//!
//! Boundary contracts for the tagscope workspace. The engine publishes
//! finished observations through [`MetricPublisher`] and reads time through
//! [`Clock`]; concrete backends live in `tagscope-adapters`.

pub mod clock;
pub mod publisher;

pub use clock::{Clock, SystemClock};
pub use publisher::{MetricPublisher, NullPublisher, PublisherError};

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
