//! Metrics rows written by the fleet monitor

use crate::agent::{AgentId, AgentState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest known throughput of one agent. One row per agent, upserted on
/// every check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedAgentMetrics {
    pub agent_id: AgentId,
    /// Exported log records during the last interval
    pub logs_rate: f64,
    /// Exported spans during the last interval
    pub traces_rate: f64,
    /// Exported metric points during the last interval
    pub metrics_rate: f64,
    /// Cumulative bytes sent by the agent's exporters
    pub bytes_sent: u64,
    /// Cumulative bytes received by the agent's receivers
    pub bytes_received: u64,
    pub status: AgentState,
    pub updated_at: DateTime<Utc>,
}

impl AggregatedAgentMetrics {
    /// Row for an agent that has not produced a successful sample yet.
    pub fn empty(agent_id: impl Into<AgentId>, status: AgentState) -> Self {
        Self {
            agent_id: agent_id.into(),
            logs_rate: 0.0,
            traces_rate: 0.0,
            metrics_rate: 0.0,
            bytes_sent: 0,
            bytes_received: 0,
            status,
            updated_at: Utc::now(),
        }
    }
}

/// Point-in-time sample, appended once per successful check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeAgentMetrics {
    pub agent_id: AgentId,
    pub logs_rate: f64,
    pub traces_rate: f64,
    pub metrics_rate: f64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Process CPU utilisation in percent of one core
    pub cpu_utilization: f64,
    /// Resident memory in bytes
    pub memory_bytes: u64,
    pub recorded_at: DateTime<Utc>,
}
