//! Tag collections with accumulating and ephemeral merge semantics.
//!
//! A [`Tags`] value is an ordered key/value string map. Two merge modes
//! exist on purpose: `add*` mutates the receiver (used when a call chain
//! accumulates context tags) and `from*` returns a new value (used for
//! per-call tag composition that must not leak back into shared state).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Construction failures for [`Tags`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagsError {
    /// A pair sequence had an odd number of elements.
    OddPairSequence {
        /// Number of elements observed in the sequence.
        len: usize,
    },
}

impl fmt::Display for TagsError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OddPairSequence { len } => {
                write!(formatter, "tags must be key/value pairs, got {len} elements")
            },
        }
    }
}

impl std::error::Error for TagsError {}

/// Ordered key/value tags attached to metric observations.
///
/// Keys are unique; a later write for an existing key overwrites the
/// earlier value. Equality and hashing are by full content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags {
    entries: BTreeMap<String, String>,
}

impl Tags {
    /// Tags with no entries.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build tags from an even-length sequence of alternating keys and
    /// values. An odd-length sequence is an input-contract violation.
    pub fn of<I, S>(pairs: I) -> Result<Self, TagsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = BTreeMap::new();
        let mut iter = pairs.into_iter();
        let mut seen = 0_usize;
        while let Some(key) = iter.next() {
            seen += 1;
            let Some(value) = iter.next() else {
                return Err(TagsError::OddPairSequence { len: seen });
            };
            seen += 1;
            entries.insert(key.into(), value.into());
        }
        Ok(Self { entries })
    }

    /// Build tags from an existing map.
    #[must_use]
    pub fn from_map(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Write a single entry, overwriting any previous value for the key.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Merge `other` into the receiver; `other` wins on key conflicts.
    pub fn add(&mut self, other: &Self) -> &mut Self {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
        self
    }

    /// Merge a pair sequence into the receiver. The receiver is untouched
    /// when the sequence is malformed.
    pub fn add_pairs<I, S>(&mut self, pairs: I) -> Result<&mut Self, TagsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let other = Self::of(pairs)?;
        Ok(self.add(&other))
    }

    /// Return a new `Tags` equal to a copy of the receiver with `other`
    /// merged on top. The receiver is untouched.
    #[must_use]
    pub fn from(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.add(other);
        merged
    }

    /// Return a new `Tags` equal to a copy of the receiver with the pair
    /// sequence merged on top.
    pub fn from_pairs<I, S>(&self, pairs: I) -> Result<Self, TagsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let other = Self::of(pairs)?;
        Ok(self.from(&other))
    }

    /// Value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether every entry of `other` is present with an equal value.
    #[must_use]
    pub fn contains_all(&self, other: &Self) -> bool {
        other
            .entries
            .iter()
            .all(|(key, value)| self.entries.get(key) == Some(value))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Tags
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}
