//! Health check procedure
//!
//! Scrape by hostname first, then by IP address; the first success wins.
//! Rates are the counter deltas between two consecutive successful checks.

use crate::roster::AgentStatus;
use agent_metrics::{CollectorSample, MetricsSource};
use chrono::{DateTime, Utc};
use overseer_core::agent::url_host;
use overseer_core::{
    AgentState, AggregatedAgentMetrics, OverseerError, RealtimeAgentMetrics, Result,
};
use tokio::time::Instant;
use tracing::debug;

pub(crate) async fn scrape(
    source: &dyn MetricsSource,
    target: &AgentStatus,
) -> Result<CollectorSample> {
    match source.fetch(&target.hostname).await {
        Ok(set) => return Ok(CollectorSample::from_metrics(&set)),
        Err(e) => debug!(
            agent_id = %target.id,
            hostname = %target.hostname,
            error = %e,
            "hostname scrape failed, falling back to ip"
        ),
    }

    match source.fetch(&url_host(&target.ip)).await {
        Ok(set) => Ok(CollectorSample::from_metrics(&set)),
        Err(e) => {
            debug!(agent_id = %target.id, ip = %target.ip, error = %e, "ip scrape failed");
            Err(OverseerError::UnreachableAgent {
                agent_id: target.id.clone(),
            })
        }
    }
}

/// Throughput derived from two consecutive samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Throughput {
    pub logs: f64,
    pub traces: f64,
    pub metrics: f64,
    /// Percent of one core over the elapsed window
    pub cpu_utilization: f64,
}

impl Throughput {
    /// Deltas from `previous` to `current`. A counter that went backwards
    /// was reset by a collector restart, so its current value is the delta.
    /// Without a previous sample there is no window and everything is zero.
    pub fn between(
        previous: Option<(&CollectorSample, Instant)>,
        current: &CollectorSample,
        now: Instant,
    ) -> Self {
        let Some((prev, at)) = previous else {
            return Self::default();
        };

        let elapsed = now.saturating_duration_since(at).as_secs_f64();
        let cpu_delta = counter_delta(prev.cpu_seconds, current.cpu_seconds);
        let cpu_utilization = if elapsed > 0.0 {
            cpu_delta / elapsed * 100.0
        } else {
            0.0
        };

        Self {
            logs: counter_delta(prev.sent_log_records, current.sent_log_records),
            traces: counter_delta(prev.sent_spans, current.sent_spans),
            metrics: counter_delta(prev.sent_metric_points, current.sent_metric_points),
            cpu_utilization,
        }
    }
}

fn counter_delta(previous: f64, current: f64) -> f64 {
    if current >= previous {
        current - previous
    } else {
        current
    }
}

pub(crate) fn metrics_rows(
    agent_id: &str,
    sample: &CollectorSample,
    throughput: Throughput,
    at: DateTime<Utc>,
) -> (AggregatedAgentMetrics, RealtimeAgentMetrics) {
    let bytes_sent = sample.bytes_sent as u64;
    let bytes_received = sample.bytes_received as u64;

    let aggregated = AggregatedAgentMetrics {
        agent_id: agent_id.to_string(),
        logs_rate: throughput.logs,
        traces_rate: throughput.traces,
        metrics_rate: throughput.metrics,
        bytes_sent,
        bytes_received,
        status: AgentState::Connected,
        updated_at: at,
    };
    let realtime = RealtimeAgentMetrics {
        agent_id: agent_id.to_string(),
        logs_rate: throughput.logs,
        traces_rate: throughput.traces,
        metrics_rate: throughput.metrics,
        bytes_sent,
        bytes_received,
        cpu_utilization: throughput.cpu_utilization,
        memory_bytes: sample.memory_rss_bytes as u64,
        recorded_at: at,
    };
    (aggregated, realtime)
}
