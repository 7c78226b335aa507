//! End-to-end declarative instrumentation tests against the public facade.

use std::fmt;
use tagscope::{
    CaptureEvent, CapturePublisher, ContextManager, FixedClock, Interceptor, MethodBinding, TagArg,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, PartialEq, Eq)]
struct LookupError {
    key: String,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no entry for {}", self.key)
    }
}

impl std::error::Error for LookupError {}

struct Directory {
    interceptor: Interceptor,
    binding: MethodBinding,
}

impl Directory {
    fn new() -> Self {
        Self {
            interceptor: Interceptor::new(),
            binding: MethodBinding::new("Directory", "lookup").with_tag("tenant"),
        }
    }

    fn lookup(&self, tenant: Option<&str>, key: &str) -> Result<String, LookupError> {
        self.interceptor
            .invoke(&self.binding, &[TagArg::from(tenant)], || {
                if key == "missing" {
                    Err(LookupError {
                        key: key.to_string(),
                    })
                } else {
                    Ok(format!("{key}@{}", tenant.unwrap_or("default")))
                }
            })
    }
}

fn wired_directory() -> (Directory, CapturePublisher) {
    let publisher = CapturePublisher::new();
    let manager = ContextManager::builder()
        .with_publisher(publisher.clone())
        .with_clock(FixedClock::with_step(0, 5))
        .build();
    let directory = Directory::new();
    directory.interceptor.install(manager);
    (directory, publisher)
}

#[test]
fn instrumented_methods_publish_timers_named_after_the_binding() {
    init_tracing();
    let (directory, publisher) = wired_directory();

    let value = directory.lookup(Some("acme"), "alice");

    assert_eq!(value, Ok("alice@acme".to_string()));
    let events = publisher.events();
    assert_eq!(events.len(), 1);
    let CaptureEvent::Time { name, duration, tags } = &events[0] else {
        panic!("expected a timer event");
    };
    assert_eq!(name, "Directory.lookup");
    assert_eq!(duration.as_millis(), 5);
    assert_eq!(tags.get("tenant"), Some("acme"));
}

#[test]
fn absent_bound_arguments_surface_as_the_null_literal() {
    init_tracing();
    let (directory, publisher) = wired_directory();

    let value = directory.lookup(None, "bob");

    assert_eq!(value, Ok("bob@default".to_string()));
    let events = publisher.events();
    let CaptureEvent::Time { tags, .. } = &events[0] else {
        panic!("expected a timer event");
    };
    assert_eq!(tags.get("tenant"), Some("null"));
}

#[test]
fn failures_pass_through_unchanged_and_are_still_timed() {
    init_tracing();
    let (directory, publisher) = wired_directory();

    let value = directory.lookup(Some("acme"), "missing");

    assert_eq!(
        value,
        Err(LookupError {
            key: "missing".to_string(),
        }),
    );
    assert_eq!(publisher.events().len(), 1);
    assert_eq!(publisher.open_calls(), 1);
    assert_eq!(publisher.close_calls(), 1);
}

#[test]
fn uninstalled_directory_still_serves_lookups() {
    init_tracing();
    let directory = Directory::new();

    let value = directory.lookup(Some("acme"), "alice");

    assert_eq!(value, Ok("alice@acme".to_string()));
}

#[test]
fn bindings_with_explicit_names_use_them_on_the_wire() {
    init_tracing();
    let publisher = CapturePublisher::new();
    let manager = ContextManager::builder()
        .with_publisher(publisher.clone())
        .build();
    let interceptor = Interceptor::new();
    interceptor.install(manager);
    let binding = MethodBinding::new("Directory", "lookup").with_metric_name("directory.read");

    let outcome: Result<(), LookupError> = interceptor.invoke(&binding, &[], || Ok(()));

    assert!(outcome.is_ok());
    let events = publisher.events();
    let CaptureEvent::Time { name, .. } = &events[0] else {
        panic!("expected a timer event");
    };
    assert_eq!(name, "directory.read");
}
