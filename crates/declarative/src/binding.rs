//! Method-to-metric bindings.

use tagscope_domain::Tags;
use tracing::warn;

/// Rendered for arguments bound to a tag that carry no value.
const NULL_LITERAL: &str = "null";

/// A call argument surfaced as a tag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagArg {
    /// A present value.
    Value(String),
    /// An absent value, rendered as the literal `"null"`.
    Null,
}

impl TagArg {
    /// A present argument value.
    pub fn of(value: impl Into<String>) -> Self {
        Self::Value(value.into())
    }

    /// The tag value this argument renders to.
    #[must_use]
    pub fn render(&self) -> &str {
        match self {
            Self::Value(value) => value,
            Self::Null => NULL_LITERAL,
        }
    }
}

impl<S: Into<String>> From<Option<S>> for TagArg {
    fn from(value: Option<S>) -> Self {
        value.map_or(Self::Null, |present| Self::Value(present.into()))
    }
}

/// Describes how one method is measured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBinding {
    type_name: String,
    method_name: String,
    metric_name: Option<String>,
    tag_names: Vec<String>,
}

impl MethodBinding {
    /// Bind a method of `type_name` named `method_name`.
    pub fn new(type_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            method_name: method_name.into(),
            metric_name: None,
            tag_names: Vec::new(),
        }
    }

    /// Override the default `Type.method` metric name.
    #[must_use]
    pub fn with_metric_name(mut self, name: impl Into<String>) -> Self {
        self.metric_name = Some(name.into());
        self
    }

    /// Append a tag bound to the next positional call argument.
    #[must_use]
    pub fn with_tag(mut self, name: impl Into<String>) -> Self {
        self.tag_names.push(name.into());
        self
    }

    /// The metric name published for this method. An empty override is
    /// treated as absent.
    #[must_use]
    pub fn metric_name(&self) -> String {
        match self.metric_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}.{}", self.type_name, self.method_name),
        }
    }

    /// Declared tag names, in positional order.
    #[must_use]
    pub fn tag_names(&self) -> &[String] {
        &self.tag_names
    }

    /// Resolve call arguments into tags.
    ///
    /// An argument count that does not match the declared tag count is a
    /// binding bug; the call proceeds without tags and the mismatch is
    /// logged.
    #[must_use]
    pub fn call_tags(&self, args: &[TagArg]) -> Tags {
        if args.len() != self.tag_names.len() {
            warn!(
                metric = %self.metric_name(),
                declared = self.tag_names.len(),
                supplied = args.len(),
                "tag binding arity mismatch, publishing without call tags"
            );
            return Tags::empty();
        }
        let mut tags = Tags::empty();
        for (name, arg) in self.tag_names.iter().zip(args) {
            tags.put(name, arg.render());
        }
        tags
    }
}
