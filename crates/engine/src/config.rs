//! Configuration for the metrics wiring.
//!
//! Configuration can come from a JSON document, from environment
//! variables, or both: environment variables applied with
//! [`MetricsConfig::apply_env`] override whatever the document set.

use crate::manager::NestingPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use tagscope_domain::Tags;

/// Environment variable overriding the metric name prefix.
pub const ENV_PREFIX: &str = "TAGSCOPE_PREFIX";

/// Environment variable overriding the nesting policy
/// (`only_outermost` or `every_scope`).
pub const ENV_NESTING_POLICY: &str = "TAGSCOPE_NESTING_POLICY";

/// Environment variable overriding the initial tags, as a
/// comma-separated `key=value` list.
pub const ENV_INITIAL_TAGS: &str = "TAGSCOPE_TAGS";

/// Configuration loading failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    Parse {
        /// Parser diagnostic.
        reason: String,
    },
    /// A nesting policy value was not recognized.
    InvalidPolicy {
        /// The rejected value.
        value: String,
    },
    /// A tag entry in the environment list was not `key=value` shaped.
    InvalidTagEntry {
        /// The rejected entry.
        entry: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { reason } => {
                write!(f, "invalid metrics config document: {reason}")
            },
            Self::InvalidPolicy { value } => write!(
                f,
                "invalid nesting policy {value:?}, expected \
                 \"only_outermost\" or \"every_scope\""
            ),
            Self::InvalidTagEntry { entry } => {
                write!(f, "invalid tag entry {entry:?}, expected key=value")
            },
        }
    }
}

impl std::error::Error for ConfigError {}

/// Declarative metrics settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Prefix prepended to every published metric name.
    pub prefix: Option<String>,
    /// Scope open/close policy.
    pub nesting_policy: NestingPolicy,
    /// Tags every context starts from.
    pub initial_tags: Tags,
}

impl MetricsConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|error| ConfigError::Parse {
            reason: error.to_string(),
        })
    }

    /// Overlay environment variable overrides onto this configuration.
    ///
    /// Unset variables leave the corresponding field untouched; an empty
    /// prefix variable clears the prefix.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(prefix) = std::env::var(ENV_PREFIX) {
            self.prefix = if prefix.is_empty() {
                None
            } else {
                Some(prefix)
            };
        }
        if let Ok(policy) = std::env::var(ENV_NESTING_POLICY) {
            self.nesting_policy = parse_policy(&policy)?;
        }
        if let Ok(tags) = std::env::var(ENV_INITIAL_TAGS) {
            self.initial_tags.add(&parse_tag_list(&tags)?);
        }
        Ok(self)
    }
}

fn parse_policy(value: &str) -> Result<NestingPolicy, ConfigError> {
    match value {
        "only_outermost" => Ok(NestingPolicy::OnlyOutermost),
        "every_scope" => Ok(NestingPolicy::EveryScope),
        other => Err(ConfigError::InvalidPolicy {
            value: other.to_string(),
        }),
    }
}

fn parse_tag_list(list: &str) -> Result<Tags, ConfigError> {
    let mut tags = Tags::empty();
    for entry in list.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((key, value)) = entry.split_once('=') else {
            return Err(ConfigError::InvalidTagEntry {
                entry: entry.to_string(),
            });
        };
        tags.put(key.trim(), value.trim());
    }
    Ok(tags)
}
