//! End-to-end context lifecycle tests against the public facade.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tagscope::testing::capture_manager;
use tagscope::{
    CaptureEvent, CapturePublisher, ContextManager, FixedClock, JsonLinesPublisher, MetricSink,
    MetricsConfig, NestingPolicy, Tags,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, PartialEq, Eq)]
struct GatewayError {
    code: u16,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gateway returned {}", self.code)
    }
}

impl std::error::Error for GatewayError {}

#[derive(Debug, PartialEq, Eq)]
struct ChargeReceipt {
    status: u16,
}

fn pairs(entries: &[(&str, &str)]) -> Tags {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect()
}

fn timer_events(publisher: &CapturePublisher) -> Vec<CaptureEvent> {
    publisher
        .events()
        .into_iter()
        .filter(|event| matches!(event, CaptureEvent::Time { .. }))
        .collect()
}

#[test]
fn request_flow_publishes_counters_and_timers_with_merged_tags() {
    init_tracing();
    let publisher = CapturePublisher::new();
    let manager = ContextManager::builder()
        .with_publisher(publisher.clone())
        .with_clock(FixedClock::with_step(10_000, 15))
        .with_tags(&pairs(&[("service", "billing")]))
        .with_prefix("prod")
        .build();
    let mut handle = manager.handle();

    let receipt = handle.with(|mut metrics| {
        metrics.and(&pairs(&[("request", "r-77")]));
        metrics.count("charge.attempt", &Tags::empty());
        metrics.time("charge", &pairs(&[("gateway", "stripe")]), || {
            Ok::<_, GatewayError>(ChargeReceipt { status: 201 })
        })
    });

    assert_eq!(receipt, Ok(ChargeReceipt { status: 201 }));

    let events = publisher.events();
    assert_eq!(events.len(), 2);

    let CaptureEvent::Increment { name, amount, tags } = &events[0] else {
        panic!("expected the counter first");
    };
    assert_eq!(name, "prod.charge.attempt");
    assert_eq!(*amount, 1);
    assert_eq!(tags.get("service"), Some("billing"));
    assert_eq!(tags.get("request"), Some("r-77"));

    let CaptureEvent::Time { name, duration, tags } = &events[1] else {
        panic!("expected the timer second");
    };
    assert_eq!(name, "prod.charge");
    assert_eq!(duration.as_millis(), 15);
    assert_eq!(tags.get("gateway"), Some("stripe"));
    assert_eq!(tags.get("request"), Some("r-77"));
}

#[test]
fn result_tag_generators_enrich_successful_timings() {
    init_tracing();
    let publisher = CapturePublisher::new();
    let manager = ContextManager::builder()
        .with_publisher(publisher.clone())
        .with_tags_generator::<ChargeReceipt, _>(|receipt| {
            let mut tags = Tags::empty();
            tags.put("status", receipt.status.to_string());
            tags
        })
        .build();
    let mut handle = manager.handle();

    let outcome = handle.with(|metrics| {
        metrics.time("charge", &Tags::empty(), || {
            Ok::<_, GatewayError>(ChargeReceipt { status: 201 })
        })
    });

    assert!(outcome.is_ok());
    let events = timer_events(&publisher);
    let CaptureEvent::Time { tags, .. } = &events[0] else {
        panic!("expected a timer event");
    };
    assert_eq!(tags.get("status"), Some("201"));
}

#[test]
fn default_error_generator_tags_failures_and_preserves_the_error() {
    init_tracing();
    let publisher = CapturePublisher::new();
    let manager = ContextManager::builder()
        .with_publisher(publisher.clone())
        .with_default_error_tags(|error| {
            let mut tags = Tags::empty();
            tags.put("outcome", "failure");
            tags.put("error", error.to_string());
            tags
        })
        .build();
    let mut handle = manager.handle();

    let outcome: Result<ChargeReceipt, GatewayError> = handle.with(|metrics| {
        metrics.time("charge", &Tags::empty(), || Err(GatewayError { code: 502 }))
    });

    assert_eq!(outcome, Err(GatewayError { code: 502 }));
    let events = timer_events(&publisher);
    assert_eq!(events.len(), 1);
    let CaptureEvent::Time { tags, .. } = &events[0] else {
        panic!("expected a timer event");
    };
    assert_eq!(tags.get("outcome"), Some("failure"));
    assert_eq!(tags.get("error"), Some("gateway returned 502"));
}

#[test]
fn explicit_error_generator_overrides_the_default() {
    init_tracing();
    let publisher = CapturePublisher::new();
    let manager = ContextManager::builder()
        .with_publisher(publisher.clone())
        .with_default_error_tags(|_| {
            let mut tags = Tags::empty();
            tags.put("outcome", "failure");
            tags
        })
        .build();
    let mut handle = manager.handle();

    let outcome: Result<ChargeReceipt, GatewayError> = handle.with(|metrics| {
        metrics.time_with(
            "charge",
            &Tags::empty(),
            None::<fn(&ChargeReceipt) -> Tags>,
            Some(|error: &GatewayError| {
                let mut tags = Tags::empty();
                tags.put("gateway_code", error.code.to_string());
                tags
            }),
            || Err(GatewayError { code: 429 }),
        )
    });

    assert!(outcome.is_err());
    let events = timer_events(&publisher);
    let CaptureEvent::Time { tags, .. } = &events[0] else {
        panic!("expected a timer event");
    };
    assert_eq!(tags.get("gateway_code"), Some("429"));
    assert_eq!(tags.get("outcome"), None);
}

#[test]
fn handles_on_separate_threads_keep_independent_contexts() {
    init_tracing();
    let (manager, publisher) = capture_manager();

    let worker = {
        let manager = Arc::clone(&manager);
        std::thread::spawn(move || {
            let mut handle = manager.handle();
            handle.with(|mut metrics| {
                metrics.and(&pairs(&[("thread", "worker")]));
                metrics.count("work", &Tags::empty());
            });
        })
    };

    let mut handle = manager.handle();
    handle.with(|metrics| {
        metrics.count("work", &Tags::empty());
        assert_eq!(metrics.tags().get("thread"), None);
    });
    worker.join().expect("worker thread completes");

    let events = publisher.events();
    assert_eq!(events.len(), 2);
    let counts = events
        .iter()
        .filter(|event| matches!(event, CaptureEvent::Increment { .. }))
        .count();
    assert_eq!(counts, 2);
}

#[test]
fn config_document_drives_prefix_policy_and_initial_tags() {
    init_tracing();
    let config = MetricsConfig::from_json(
        r#"{
            "prefix": "billing",
            "nesting_policy": "every_scope",
            "initial_tags": {"region": "us-east-1"}
        }"#,
    )
    .expect("config parses");

    let publisher = CapturePublisher::new();
    let manager = ContextManager::builder()
        .with_publisher(publisher.clone())
        .from_config(&config)
        .build();
    assert_eq!(manager.nesting_policy(), NestingPolicy::EveryScope);

    let mut handle = manager.handle();
    handle.with(|metrics| metrics.count("orders", &Tags::empty()));

    let events = publisher.events();
    let CaptureEvent::Increment { name, tags, .. } = &events[0] else {
        panic!("expected an increment event");
    };
    assert_eq!(name, "billing.orders");
    assert_eq!(tags.get("region"), Some("us-east-1"));
}

#[derive(Default)]
struct LineBuffer {
    lines: Mutex<Vec<String>>,
}

impl MetricSink for LineBuffer {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

#[test]
fn json_lines_publisher_emits_parseable_metric_lines() {
    init_tracing();
    let sink = Arc::new(LineBuffer::default());
    let manager = ContextManager::builder()
        .with_publisher(JsonLinesPublisher::new(
            Arc::clone(&sink) as Arc<dyn MetricSink>
        ))
        .with_tags(&pairs(&[("service", "billing")]))
        .build();
    let mut handle = manager.handle();

    handle.with(|metrics| {
        metrics.increment("orders", 3, &Tags::empty());
    });

    let lines = sink
        .lines
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    assert_eq!(lines.len(), 1);
    let payload: serde_json::Value =
        serde_json::from_str(lines[0].trim_end()).expect("line parses as JSON");
    assert_eq!(payload["metricType"], "counter");
    assert_eq!(payload["name"], "orders");
    assert_eq!(payload["value"], 3);
    assert_eq!(payload["tags"]["service"], "billing");
}
