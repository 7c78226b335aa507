//! # tagscope-domain
//!
//! Tag value types for the tagscope workspace: the [`Tags`] collection and
//! its construction/merge error type. This crate has no workspace
//! dependencies; every other crate builds on it.

pub mod tags;

pub use tags::{Tags, TagsError};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
