//! Context lifecycle management.
//!
//! [`ContextManager`] is the process-wide wiring (publisher, clock,
//! registry, initial tags, nesting policy). It is shared behind an `Arc`;
//! each thread creates its own [`MetricsHandle`] and threads it through
//! calls. The handle owns the context stack, so confinement is enforced by
//! ownership rather than hidden thread-local state: using a handle from two
//! threads at once would require aliasing a `&mut`, which the borrow
//! checker rejects.

use crate::config::MetricsConfig;
use crate::context::{ErrorTagsGenerator, MetricsContext};
use crate::registry::TagsGeneratorRegistry;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tagscope_domain::{Tags, TagsError};
use tagscope_ports::{Clock, MetricPublisher, NullPublisher, SystemClock};
use tracing::{debug, warn};

static EMPTY_TAGS: Tags = Tags::empty();

/// Whether scope-boundary publisher hooks fire once per outermost scope or
/// once per nested scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingPolicy {
    /// `open()`/`close()` fire only at the outermost nesting level; nested
    /// scopes share the outer context, so tags added inside remain visible
    /// outside until the outermost exit resets them.
    #[default]
    OnlyOutermost,
    /// Every scope fires `open()`/`close()` and gets a fresh context
    /// copying the current tags, isolating inner additions from the parent
    /// once the scope pops.
    EveryScope,
}

/// Process-wide metrics wiring shared across threads.
pub struct ContextManager {
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn MetricPublisher>,
    registry: Arc<TagsGeneratorRegistry>,
    default_error_tags: Option<ErrorTagsGenerator>,
    initial_tags: Tags,
    policy: NestingPolicy,
    prefix: Option<Arc<str>>,
}

impl ContextManager {
    /// Start building a manager. The zero-configuration build publishes to
    /// [`NullPublisher`].
    #[must_use]
    pub fn builder() -> ContextManagerBuilder {
        ContextManagerBuilder::default()
    }

    /// Create a handle for the calling thread. Each thread must create its
    /// own handle; a handle is never shared between concurrent threads.
    #[must_use]
    pub fn handle(self: &Arc<Self>) -> MetricsHandle {
        MetricsHandle {
            manager: Arc::clone(self),
            stack: Vec::new(),
        }
    }

    /// The configured nesting policy.
    #[must_use]
    pub fn nesting_policy(&self) -> NestingPolicy {
        self.policy
    }

    /// The tag set every new context starts from.
    #[must_use]
    pub fn initial_tags(&self) -> &Tags {
        &self.initial_tags
    }

    fn new_context(&self, tags: Tags) -> MetricsContext {
        MetricsContext::new(
            Arc::clone(&self.clock),
            Arc::clone(&self.publisher),
            Arc::clone(&self.registry),
            self.default_error_tags.clone(),
            self.prefix.clone(),
            tags,
        )
    }
}

/// Builder for [`ContextManager`].
pub struct ContextManagerBuilder {
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn MetricPublisher>,
    registry: TagsGeneratorRegistry,
    default_error_tags: Option<ErrorTagsGenerator>,
    tags: Tags,
    policy: NestingPolicy,
    prefix: Option<String>,
}

impl Default for ContextManagerBuilder {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            publisher: Arc::new(NullPublisher),
            registry: TagsGeneratorRegistry::new(),
            default_error_tags: None,
            tags: Tags::empty(),
            policy: NestingPolicy::default(),
            prefix: None,
        }
    }
}

impl ContextManagerBuilder {
    /// Set the clock used for timing reads.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Set the backend publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: impl MetricPublisher + 'static) -> Self {
        self.publisher = Arc::new(publisher);
        self
    }

    /// Merge tags into the initial tag set every context starts from.
    #[must_use]
    pub fn with_tags(mut self, tags: &Tags) -> Self {
        self.tags.add(tags);
        self
    }

    /// Replace the tag generator registry.
    #[must_use]
    pub fn with_registry(mut self, registry: TagsGeneratorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a tag generator for values of type `R`.
    #[must_use]
    pub fn with_tags_generator<R, G>(mut self, generator: G) -> Self
    where
        R: Any,
        G: Fn(&R) -> Tags + Send + Sync + 'static,
    {
        self.registry.register::<R, G>(generator);
        self
    }

    /// Set the default tag generator applied to failures when a timed call
    /// gives no explicit error generator.
    #[must_use]
    pub fn with_default_error_tags<G>(mut self, generator: G) -> Self
    where
        G: Fn(&(dyn std::error::Error + 'static)) -> Tags + Send + Sync + 'static,
    {
        self.default_error_tags = Some(Arc::new(generator));
        self
    }

    /// Set the nesting policy.
    #[must_use]
    pub fn with_nesting_policy(mut self, policy: NestingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Prepend `prefix` to every published metric name.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Apply prefix, policy, and initial tags from a [`MetricsConfig`].
    #[must_use]
    pub fn from_config(mut self, config: &MetricsConfig) -> Self {
        if let Some(prefix) = &config.prefix {
            self.prefix = Some(prefix.clone());
        }
        self.policy = config.nesting_policy;
        self.tags.add(&config.initial_tags);
        self
    }

    /// Build the shared manager.
    #[must_use]
    pub fn build(self) -> Arc<ContextManager> {
        debug!(
            policy = ?self.policy,
            prefix = self.prefix.as_deref().unwrap_or(""),
            initial_tags = self.tags.len(),
            generators = self.registry.registered_count(),
            "context manager built"
        );
        Arc::new(ContextManager {
            clock: self.clock,
            publisher: self.publisher,
            registry: Arc::new(self.registry),
            default_error_tags: self.default_error_tags,
            initial_tags: self.tags,
            policy: self.policy,
            prefix: self.prefix.map(Arc::from),
        })
    }
}

/// Thread-confined handle owning the nested context stack.
///
/// `enter`/`exit` must nest in strict LIFO order; [`MetricsHandle::with`]
/// enforces that shape and releases the scope even when the operation
/// unwinds.
pub struct MetricsHandle {
    manager: Arc<ContextManager>,
    stack: Vec<MetricsContext>,
}

impl MetricsHandle {
    /// Open a metrics scope.
    pub fn enter(&mut self) {
        if self.stack.is_empty() {
            let mut context = self
                .manager
                .new_context(self.manager.initial_tags.clone());
            context.open();
            self.stack.push(context);
            self.open_publisher();
            return;
        }
        match self.manager.policy {
            NestingPolicy::OnlyOutermost => {
                if let Some(context) = self.stack.last_mut() {
                    context.open();
                }
            },
            NestingPolicy::EveryScope => {
                let carried = self.stack.last().map(|context| context.tags().clone());
                if let Some(tags) = carried {
                    let mut context = self.manager.new_context(tags);
                    context.open();
                    self.stack.push(context);
                    self.open_publisher();
                }
            },
        }
    }

    /// Close the innermost metrics scope.
    ///
    /// Calling `exit` with no active context is a logged no-op.
    pub fn exit(&mut self) {
        if self.stack.is_empty() {
            warn!("metrics scope exit with no active context");
            return;
        }
        match self.manager.policy {
            NestingPolicy::OnlyOutermost => {
                let mut reached_zero = false;
                if let Some(context) = self.stack.last_mut() {
                    reached_zero = context.release();
                    if reached_zero {
                        context.reset();
                    }
                }
                if reached_zero {
                    self.stack.pop();
                    self.close_publisher();
                }
            },
            NestingPolicy::EveryScope => {
                if let Some(mut context) = self.stack.pop() {
                    context.release();
                }
                self.close_publisher();
            },
        }
    }

    /// Logical nesting depth for the calling thread.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self.manager.policy {
            NestingPolicy::OnlyOutermost => {
                self.stack.last().map_or(0, MetricsContext::open_count)
            },
            NestingPolicy::EveryScope => self.stack.len(),
        }
    }

    /// Whether a context is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    /// The active metrics context, or the no-op null object when no scope
    /// is open, so instrumentation outside any scope is safe.
    pub fn metrics(&mut self) -> MetricsRef<'_> {
        match self.stack.last_mut() {
            Some(context) => MetricsRef::Live(context),
            None => MetricsRef::Null,
        }
    }

    /// Run `operation` inside a scope: enter, invoke, exit. The scope is
    /// released even when `operation` unwinds.
    pub fn with<T>(&mut self, operation: impl FnOnce(MetricsRef<'_>) -> T) -> T {
        self.enter();
        let guard = ExitGuard { handle: self };
        let result = match guard.handle.stack.last_mut() {
            Some(context) => operation(MetricsRef::Live(context)),
            None => operation(MetricsRef::Null),
        };
        drop(guard);
        result
    }

    fn open_publisher(&self) {
        if let Err(error) = self.manager.publisher.open() {
            warn!(%error, "metric publisher open failed");
        }
    }

    fn close_publisher(&self) {
        if let Err(error) = self.manager.publisher.close() {
            warn!(%error, "metric publisher close failed");
        }
    }
}

struct ExitGuard<'a> {
    handle: &'a mut MetricsHandle,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.handle.exit();
    }
}

/// Either the live context of an open scope or a no-op null object.
pub enum MetricsRef<'a> {
    /// A live context; operations record and publish.
    Live(&'a mut MetricsContext),
    /// No active scope; operations are safe no-ops.
    Null,
}

impl MetricsRef<'_> {
    /// Whether this reference points at a live context.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    /// Current tags, or the empty set when no scope is active.
    #[must_use]
    pub fn tags(&self) -> &Tags {
        match self {
            Self::Live(context) => context.tags(),
            Self::Null => &EMPTY_TAGS,
        }
    }

    /// Merge `tags` into the active context; no-op without a scope.
    pub fn and(&mut self, tags: &Tags) -> &Tags {
        match self {
            Self::Live(context) => context.and(tags),
            Self::Null => &EMPTY_TAGS,
        }
    }

    /// Merge a pair sequence into the active context.
    pub fn and_pairs<I, S>(&mut self, pairs: I) -> Result<&Tags, TagsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self {
            Self::Live(context) => context.and_pairs(pairs),
            Self::Null => {
                Tags::of(pairs)?;
                Ok(&EMPTY_TAGS)
            },
        }
    }

    /// Record a counter increment.
    pub fn increment(&self, name: &str, amount: u64, tags: &Tags) {
        if let Self::Live(context) = self {
            context.increment(name, amount, tags);
        }
    }

    /// Record a counter increment of one.
    pub fn count(&self, name: &str, tags: &Tags) {
        self.increment(name, 1, tags);
    }

    /// Time `supplier`; without a scope the supplier runs unobserved.
    pub fn time<R, E, F>(&self, name: &str, tags: &Tags, supplier: F) -> Result<R, E>
    where
        R: 'static,
        E: std::error::Error + 'static,
        F: FnOnce() -> Result<R, E>,
    {
        match self {
            Self::Live(context) => context.time(name, tags, supplier),
            Self::Null => supplier(),
        }
    }

    /// Time `supplier` with explicit per-call tag generators.
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
        match self {
            Self::Live(context) => {
                context.time_with(name, tags, result_tags, error_tags, supplier)
            },
            Self::Null => supplier(),
        }
    }

    /// Publish a pre-computed duration; no-op without a scope.
    pub fn publish_time(&self, name: &str, duration: Duration, tags: &Tags) {
        if let Self::Live(context) = self {
            context.publish_time(name, duration, tags);
        }
    }
}
