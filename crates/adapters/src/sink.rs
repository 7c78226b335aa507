//! Line sinks for the JSON publisher.

use std::io::Write;

/// A sink that receives pre-formatted metric lines.
pub trait MetricSink: Send + Sync {
    /// Write a line to the sink.
    fn write_line(&self, line: &str);
}

/// Metric sink that writes to stderr.
#[derive(Debug, Default)]
pub struct StderrSink;

impl MetricSink for StderrSink {
    fn write_line(&self, line: &str) {
        let mut stderr = std::io::stderr();
        if let Err(error) = stderr.write_all(line.as_bytes()) {
            eprintln!("metric sink write failed: {error}");
        }
    }
}
