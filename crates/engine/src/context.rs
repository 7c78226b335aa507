//! Per-call-chain metrics context.
//!
//! A [`MetricsContext`] owns the tags accumulated across a nested call
//! chain and forwards finished observations to the publisher. It is
//! exclusively owned by one logical thread of execution; the nesting
//! lifecycle around it is driven by [`crate::manager::MetricsHandle`].

use crate::registry::TagsGeneratorRegistry;
use std::sync::Arc;
use std::time::Duration;
use tagscope_domain::{Tags, TagsError};
use tagscope_ports::{Clock, MetricPublisher};
use tracing::trace;

/// Type-erased generator producing tags from a failed operation's error.
pub type ErrorTagsGenerator =
    Arc<dyn Fn(&(dyn std::error::Error + 'static)) -> Tags + Send + Sync>;

/// Mutable per-call-chain metrics state.
///
/// The current tag set always contains the initial tag set as a subset;
/// tags are additive for the lifetime of the context and only [`reset`]
/// (driven at nesting depth zero) clears them back.
///
/// [`reset`]: MetricsContext::reset
pub struct MetricsContext {
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn MetricPublisher>,
    registry: Arc<TagsGeneratorRegistry>,
    default_error_tags: Option<ErrorTagsGenerator>,
    prefix: Option<Arc<str>>,
    initial_tags: Tags,
    tags: Tags,
    open_count: usize,
}

impl MetricsContext {
    pub(crate) fn new(
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn MetricPublisher>,
        registry: Arc<TagsGeneratorRegistry>,
        default_error_tags: Option<ErrorTagsGenerator>,
        prefix: Option<Arc<str>>,
        initial_tags: Tags,
    ) -> Self {
        let tags = initial_tags.clone();
        Self {
            clock,
            publisher,
            registry,
            default_error_tags,
            prefix,
            initial_tags,
            tags,
            open_count: 0,
        }
    }

    /// The tags currently accumulated on this context.
    #[must_use]
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Merge `tags` into the context's current tags and return them.
    pub fn and(&mut self, tags: &Tags) -> &Tags {
        self.tags.add(tags);
        &self.tags
    }

    /// Merge a pair sequence into the context's current tags.
    pub fn and_pairs<I, S>(&mut self, pairs: I) -> Result<&Tags, TagsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.add_pairs(pairs)?;
        Ok(&self.tags)
    }

    /// Record a counter increment. Call-site `tags` are merged on top of
    /// the context tags for this observation only; they are not absorbed
    /// into the context.
    pub fn increment(&self, name: &str, amount: u64, tags: &Tags) {
        let merged = self.tags.from(tags);
        self.publisher.increment(&self.qualified(name), amount, &merged);
    }

    /// Record a counter increment of one.
    pub fn count(&self, name: &str, tags: &Tags) {
        self.increment(name, 1, tags);
    }

    /// Time `supplier` and publish the duration under `name`.
    ///
    /// The supplier's result is returned unchanged, `Ok` or `Err`. On
    /// success the registry may enrich the published tags from the return
    /// value; on failure the configured default error-tag generator
    /// applies. Exactly one duration is published either way.
    pub fn time<R, E, F>(&self, name: &str, tags: &Tags, supplier: F) -> Result<R, E>
    where
        R: 'static,
        E: std::error::Error + 'static,
        F: FnOnce() -> Result<R, E>,
    {
        self.time_with(
            name,
            tags,
            None::<fn(&R) -> Tags>,
            None::<fn(&E) -> Tags>,
            supplier,
        )
    }

    /// Time `supplier` with explicit per-call tag generators.
    ///
    /// `result_tags` overrides the registry lookup for successful results;
    /// `error_tags` overrides the configured default for failures.
    pub fn time_with<R, E, F, G, H>(
        &self,
        name: &str,
        tags: &Tags,
        result_tags: Option<G>,
        error_tags: Option<H>,
        supplier: F,
    ) -> Result<R, E>
    where
        R: 'static,
        E: std::error::Error + 'static,
        F: FnOnce() -> Result<R, E>,
        G: Fn(&R) -> Tags,
        H: Fn(&E) -> Tags,
    {
        let mut merged = self.tags.from(tags);
        let start = self.clock.now_millis();
        let outcome = supplier();
        let end = self.clock.now_millis();

        match &outcome {
            Ok(value) => {
                if let Some(generator) = &result_tags {
                    merged.add(&generator(value));
                } else {
                    self.registry.aggregate_if_found(&mut merged, value);
                }
            },
            Err(error) => {
                if let Some(generator) = &error_tags {
                    merged.add(&generator(error));
                } else if let Some(default) = &self.default_error_tags {
                    let erased: &(dyn std::error::Error + 'static) = error;
                    merged.add(&default(erased));
                }
            },
        }

        let duration = Duration::from_millis(end.saturating_sub(start));
        self.publisher.time(&self.qualified(name), duration, &merged);
        outcome
    }

    /// Publish a pre-computed duration directly, bypassing the
    /// supplier-timing path.
    pub fn publish_time(&self, name: &str, duration: Duration, tags: &Tags) {
        let merged = self.tags.from(tags);
        self.publisher.time(&self.qualified(name), duration, &merged);
    }

    pub(crate) fn open(&mut self) {
        self.open_count += 1;
        trace!(open_count = self.open_count, "metrics context opened");
    }

    /// Decrement the open count; returns true when it reached zero.
    pub(crate) fn release(&mut self) -> bool {
        self.open_count = self.open_count.saturating_sub(1);
        trace!(open_count = self.open_count, "metrics context released");
        self.open_count == 0
    }

    pub(crate) fn open_count(&self) -> usize {
        self.open_count
    }

    /// Clear tags back to the initial set and zero the open count.
    pub(crate) fn reset(&mut self) {
        self.open_count = 0;
        self.tags = self.initial_tags.clone();
    }

    fn qualified(&self, name: &str) -> String {
        self.prefix.as_deref().map_or_else(
            || name.to_string(),
            |prefix| format!("{prefix}.{name}"),
        )
    }
}
