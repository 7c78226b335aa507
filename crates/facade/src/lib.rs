//! # tagscope
//!
//! Thread-scoped metrics instrumentation with contextual tags.
//!
//! Build a [`ContextManager`] once, share it behind an `Arc`, and give
//! each thread its own [`MetricsHandle`]:
//!
//! ```
//! use tagscope::{ContextManager, Tags};
//!
//! let manager = ContextManager::builder()
//!     .with_tags(&Tags::of(["service", "billing"])?)
//!     .build();
//! let mut handle = manager.handle();
//!
//! let charged = handle.with(|metrics| {
//!     metrics.time("charge", &Tags::empty(), || {
//!         Ok::<_, std::convert::Infallible>(42_u32)
//!     })
//! })?;
//! assert_eq!(charged, 42);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use tagscope_adapters::{
    CaptureEvent, CapturePublisher, FixedClock, JsonLinesPublisher, MetricSink, StderrSink,
};
pub use tagscope_declarative::{InterceptError, Interceptor, MethodBinding, TagArg};
pub use tagscope_domain::{Tags, TagsError};
pub use tagscope_engine::{
    ConfigError, ContextManager, ContextManagerBuilder, ENV_INITIAL_TAGS, ENV_NESTING_POLICY,
    ENV_PREFIX, ErrorTagsGenerator, MetricsConfig, MetricsContext, MetricsHandle, MetricsRef,
    NestingPolicy, TagsGeneratorRegistry,
};
pub use tagscope_ports::{Clock, MetricPublisher, NullPublisher, PublisherError, SystemClock};

/// Helpers for tests that assert on published metrics.
pub mod testing {
    use crate::{CapturePublisher, ContextManager, FixedClock};
    use std::sync::Arc;

    /// A manager wired to a capture publisher and a stepping clock, plus
    /// the publisher for assertions.
    #[must_use]
    pub fn capture_manager() -> (Arc<ContextManager>, CapturePublisher) {
        let publisher = CapturePublisher::new();
        let manager = ContextManager::builder()
            .with_publisher(publisher.clone())
            .with_clock(FixedClock::with_step(0, 1))
            .build();
        (manager, publisher)
    }
}

/// Crate version, exposed for diagnostics.
#[must_use]
pub const fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
