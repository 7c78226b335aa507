//! # tagscope-engine
//!
//! The thread-scoped metrics context engine: per-call-chain tag
//! accumulation, failure-preserving timing, type-keyed tag enrichment, and the
//! nesting lifecycle that drives publisher open/close hooks.
//!
//! Process-wide wiring lives in [`ContextManager`]; each thread creates its
//! own [`MetricsHandle`] and threads it through calls instead of relying on
//! hidden thread-local state.

pub mod config;
pub mod context;
pub mod manager;
pub mod registry;

pub use config::{
    ConfigError, ENV_INITIAL_TAGS, ENV_NESTING_POLICY, ENV_PREFIX, MetricsConfig,
};
pub use context::{ErrorTagsGenerator, MetricsContext};
pub use manager::{
    ContextManager, ContextManagerBuilder, MetricsHandle, MetricsRef, NestingPolicy,
};
pub use registry::TagsGeneratorRegistry;

/// Returns the engine crate version.
#[must_use]
pub const fn engine_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
