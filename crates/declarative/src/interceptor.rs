//! Call interception against an installed context manager.

use crate::binding::{MethodBinding, TagArg};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tagscope_engine::{ContextManager, MetricsHandle};
use tracing::{debug, warn};

/// Interceptor wiring failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptError {
    /// The value handed to [`Interceptor::install_from_any`] was not a
    /// shared context manager.
    ConfigurationMismatch {
        /// The type the interceptor expected.
        expected: &'static str,
    },
}

impl fmt::Display for InterceptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigurationMismatch { expected } => {
                write!(f, "interceptor expected a {expected}")
            },
        }
    }
}

impl std::error::Error for InterceptError {}

/// Applies [`MethodBinding`]s to calls.
///
/// The interceptor starts uninstalled and passes calls through untouched
/// until a manager is installed. Installing a second manager replaces the
/// first; the replacement is logged because it usually means two
/// components both think they own the wiring.
#[derive(Default)]
pub struct Interceptor {
    manager: RwLock<Option<Arc<ContextManager>>>,
}

impl Interceptor {
    /// Create an uninstalled interceptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the context manager measured calls run against.
    pub fn install(&self, manager: Arc<ContextManager>) {
        let mut slot = self
            .manager
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            warn!("interceptor already installed, replacing the manager");
        }
        *slot = Some(manager);
    }

    /// Install from type-erased wiring, e.g. a plugin registry.
    pub fn install_from_any(&self, manager: Box<dyn Any>) -> Result<(), InterceptError> {
        match manager.downcast::<Arc<ContextManager>>() {
            Ok(manager) => {
                self.install(*manager);
                Ok(())
            },
            Err(_) => Err(InterceptError::ConfigurationMismatch {
                expected: "Arc<ContextManager>",
            }),
        }
    }

    /// Whether a manager is installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.manager
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The installed manager, if any.
    #[must_use]
    pub fn manager(&self) -> Option<Arc<ContextManager>> {
        self.manager
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `supplier` as a measured call described by `binding`.
    ///
    /// The call is timed inside its own metrics scope, tagged with the
    /// binding's resolved call tags, and its result returned unchanged.
    /// With no manager installed the supplier runs unobserved.
    pub fn invoke<R, E, F>(
        &self,
        binding: &MethodBinding,
        args: &[TagArg],
        supplier: F,
    ) -> Result<R, E>
    where
        R: 'static,
        E: std::error::Error + 'static,
        F: FnOnce() -> Result<R, E>,
    {
        let Some(manager) = self.manager() else {
            debug!(
                metric = %binding.metric_name(),
                "no manager installed, call passes through unmeasured"
            );
            return supplier();
        };
        let mut handle = manager.handle();
        handle.with(|metrics| {
            metrics.time(&binding.metric_name(), &binding.call_tags(args), supplier)
        })
    }

    /// Run `supplier` as a measured call nested inside `handle`'s scope
    /// chain, so tags accumulated on the caller's open scope apply to the
    /// published observation. The handle carries its own wiring, so the
    /// interceptor's install state is irrelevant here.
    #[expect(
        clippy::unused_self,
        reason = "method form keeps call sites symmetrical with invoke()"
    )]
    pub fn invoke_on<R, E, F>(
        &self,
        handle: &mut MetricsHandle,
        binding: &MethodBinding,
        args: &[TagArg],
        supplier: F,
    ) -> Result<R, E>
    where
        R: 'static,
        E: std::error::Error + 'static,
        F: FnOnce() -> Result<R, E>,
    {
        handle.with(|metrics| {
            metrics.time(&binding.metric_name(), &binding.call_tags(args), supplier)
        })
    }
}
