//! Type-keyed tag generator registry.
//!
//! Maps an exact runtime type to a function producing [`Tags`] from a value
//! of that type. The timed path consults the registry to enrich merged tags
//! from a supplier's return value when no explicit generator was given.

use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::fmt;
use tagscope_domain::Tags;

type ErasedGenerator = Box<dyn Fn(&dyn Any) -> Tags + Send + Sync>;

/// Registry of per-type tag generators.
///
/// Lookups use the exact static type of the observed value, never
/// supertypes or trait objects.
#[derive(Default)]
pub struct TagsGeneratorRegistry {
    generators: FxHashMap<TypeId, ErasedGenerator>,
}

impl TagsGeneratorRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator for values of type `R`, replacing any previous
    /// generator for that type.
    pub fn register<R, G>(&mut self, generator: G)
    where
        R: Any,
        G: Fn(&R) -> Tags + Send + Sync + 'static,
    {
        self.generators.insert(
            TypeId::of::<R>(),
            Box::new(move |value: &dyn Any| {
                value.downcast_ref::<R>().map_or_else(Tags::empty, &generator)
            }),
        );
    }

    /// Remove the generator for type `R`, if any.
    pub fn deregister<R: Any>(&mut self) {
        self.generators.remove(&TypeId::of::<R>());
    }

    /// Whether a generator is registered for type `R`.
    #[must_use]
    pub fn contains<R: Any>(&self) -> bool {
        self.generators.contains_key(&TypeId::of::<R>())
    }

    /// Number of registered generators.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.generators.len()
    }

    /// Merge generated tags into `tags` when a generator exists for the
    /// exact type of `value`; no-op otherwise.
    pub fn aggregate_if_found<R: Any>(&self, tags: &mut Tags, value: &R) {
        if let Some(generator) = self.generators.get(&TypeId::of::<R>()) {
            tags.add(&generator(value));
        }
    }

    /// Like [`Self::aggregate_if_found`], but does nothing for `None`.
    pub fn aggregate_if_found_opt<R: Any>(&self, tags: &mut Tags, value: Option<&R>) {
        if let Some(value) = value {
            self.aggregate_if_found(tags, value);
        }
    }
}

impl fmt::Debug for TagsGeneratorRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TagsGeneratorRegistry")
            .field("registered", &self.generators.len())
            .finish()
    }
}
