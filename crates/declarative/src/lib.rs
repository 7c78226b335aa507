//! Declarative method instrumentation.
//!
//! A [`MethodBinding`] describes how one method is measured: the metric
//! name (defaulting to `Type.method`) and which call arguments become
//! tags. The [`Interceptor`] applies bindings to calls against whatever
//! context manager was installed into it, and passes calls through
//! untouched while nothing is installed.

pub mod binding;
pub mod interceptor;

pub use binding::{MethodBinding, TagArg};
pub use interceptor::{InterceptError, Interceptor};

/// Crate version, exposed for diagnostics.
#[must_use]
pub const fn declarative_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
