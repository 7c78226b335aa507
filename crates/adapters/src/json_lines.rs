//! JSON lines metric publisher.

use crate::sink::MetricSink;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tagscope_domain::Tags;
use tagscope_ports::MetricPublisher;

/// Publisher that emits one JSON object per metric event.
#[derive(Clone)]
pub struct JsonLinesPublisher {
    sink: Arc<dyn MetricSink>,
}

impl JsonLinesPublisher {
    /// Create a publisher backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self { sink }
    }
}

impl MetricPublisher for JsonLinesPublisher {
    fn increment(&self, name: &str, amount: u64, tags: &Tags) {
        let payload = metric_payload("counter", name, amount, None, tags);
        self.sink.write_line(&payload);
    }

    fn time(&self, name: &str, duration: Duration, tags: &Tags) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let payload = metric_payload("timer", name, millis, Some("ms"), tags);
        self.sink.write_line(&payload);
    }
}

fn metric_payload(
    metric_type: &str,
    name: &str,
    value: u64,
    unit: Option<&str>,
    tags: &Tags,
) -> String {
    let mut payload = serde_json::Map::new();
    payload.insert("type".to_string(), Value::String("metric".to_string()));
    payload.insert("timestampMs".to_string(), Value::from(now_epoch_ms()));
    payload.insert(
        "metricType".to_string(),
        Value::String(metric_type.to_string()),
    );
    payload.insert("name".to_string(), Value::String(name.to_string()));
    payload.insert("value".to_string(), Value::from(value));
    if let Some(unit) = unit {
        payload.insert("unit".to_string(), Value::String(unit.to_string()));
    }
    if !tags.is_empty() {
        payload.insert("tags".to_string(), tags_to_json(tags));
    }
    to_line(payload)
}

fn tags_to_json(tags: &Tags) -> Value {
    let mut map = serde_json::Map::new();
    for (key, value) in tags.iter() {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Value::Object(map)
}

fn to_line(payload: serde_json::Map<String, Value>) -> String {
    serde_json::to_string(&Value::Object(payload)).map_or_else(
        |_| {
            "{\"type\":\"metric\",\"metricType\":\"error\",\"name\":\"metrics.serialize_failed\",\"value\":1}\n"
                .to_string()
        },
        |mut encoded| {
            encoded.push('\n');
            encoded
        },
    )
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}
