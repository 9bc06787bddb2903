//! Prometheus text exposition parsing

use prometheus_parse::{Scrape, Value};
use std::collections::HashMap;
use std::io;
use tracing::debug;

/// Self-metric names published by the collector runtime.
pub mod names {
    pub const SENT_LOG_RECORDS: &str = "otelcol_exporter_sent_log_records";
    pub const SENT_SPANS: &str = "otelcol_exporter_sent_spans";
    pub const SENT_METRIC_POINTS: &str = "otelcol_exporter_sent_metric_points";
    pub const SENT_BYTES: &str = "otelcol_exporter_sent_bytes";
    pub const RECEIVED_BYTES: &str = "otelcol_receiver_received_bytes";
    pub const PROCESS_CPU_SECONDS: &str = "otelcol_process_cpu_seconds";
    pub const PROCESS_MEMORY_RSS: &str = "otelcol_process_memory_rss";
}

/// Metric family name to value. Label series of one family are summed, so a
/// counter split by exporter reads as the fleet-wide total for that agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    values: HashMap<String, f64>,
}

impl MetricSet {
    /// Value of `name` (or `name_total`); missing metrics read as zero.
    pub fn get(&self, name: &str) -> f64 {
        self.lookup(name).unwrap_or(0.0)
    }

    pub fn lookup(&self, name: &str) -> Option<f64> {
        self.values
            .get(name)
            .or_else(|| self.values.get(&format!("{name}_total")))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn add(&mut self, name: &str, value: f64) {
        *self.values.entry(name.to_string()).or_insert(0.0) += value;
    }
}

impl FromIterator<(String, f64)> for MetricSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut set = MetricSet::default();
        for (name, value) in iter {
            set.add(&name, value);
        }
        set
    }
}

/// Parse a text exposition payload. Histogram and summary families and
/// non-finite samples are dropped; every other sample is folded into its
/// metric name regardless of labels.
pub fn parse_exposition(text: &str) -> io::Result<MetricSet> {
    let scrape = Scrape::parse(text.lines().map(|line| Ok(line.to_string())))?;
    let mut set = MetricSet::default();
    for sample in scrape.samples {
        match sample.value {
            Value::Counter(v) | Value::Gauge(v) | Value::Untyped(v) if v.is_finite() => {
                set.add(&sample.metric, v)
            }
            _ => debug!(metric = %sample.metric, "skipping non-scalar or non-finite sample"),
        }
    }
    Ok(set)
}

/// The values one health check extracts from an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollectorSample {
    pub sent_log_records: f64,
    pub sent_spans: f64,
    pub sent_metric_points: f64,
    pub bytes_sent: f64,
    pub bytes_received: f64,
    pub cpu_seconds: f64,
    pub memory_rss_bytes: f64,
}

impl CollectorSample {
    pub fn from_metrics(set: &MetricSet) -> Self {
        Self {
            sent_log_records: set.get(names::SENT_LOG_RECORDS),
            sent_spans: set.get(names::SENT_SPANS),
            sent_metric_points: set.get(names::SENT_METRIC_POINTS),
            bytes_sent: set.get(names::SENT_BYTES),
            bytes_received: set.get(names::RECEIVED_BYTES),
            cpu_seconds: set.get(names::PROCESS_CPU_SECONDS),
            memory_rss_bytes: set.get(names::PROCESS_MEMORY_RSS),
        }
    }
}
