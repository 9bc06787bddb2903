//! Storage port
//!
//! The monitor only needs three operations from persistent storage; the
//! rest serve the platform's read API. `MemoryStore` backs tests and
//! single-node deployments.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use overseer_core::{
    AgentRecord, AgentState, AggregatedAgentMetrics, RealtimeAgentMetrics, Result,
};
use std::collections::VecDeque;
use tracing::debug;

#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Agents whose last known state was `unknown` or `connected`.
    async fn load_tracked_agents(&self) -> Result<Vec<AgentRecord>>;

    /// Upsert the aggregated row and append the realtime row.
    async fn upsert_metrics(
        &self,
        aggregated: &AggregatedAgentMetrics,
        realtime: &RealtimeAgentMetrics,
    ) -> Result<()>;

    async fn update_agent_status(&self, agent_id: &str, state: AgentState) -> Result<()>;

    async fn register_agent(&self, record: &AgentRecord) -> Result<()>;

    async fn remove_agent(&self, agent_id: &str) -> Result<()>;

    async fn aggregated_metrics(&self, agent_id: &str) -> Result<Option<AggregatedAgentMetrics>>;

    /// Most recent realtime rows, oldest first.
    async fn realtime_metrics(&self, agent_id: &str, limit: usize)
        -> Result<Vec<RealtimeAgentMetrics>>;
}

/// Keep a day of samples at the default 30s interval.
const DEFAULT_REALTIME_RETENTION: usize = 2880;

#[derive(Debug)]
pub struct MemoryStore {
    agents: DashMap<String, AgentRecord>,
    aggregated: DashMap<String, AggregatedAgentMetrics>,
    realtime: DashMap<String, VecDeque<RealtimeAgentMetrics>>,
    retention: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_REALTIME_RETENTION)
    }

    /// Cap the realtime series per agent; the oldest rows go first.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            agents: DashMap::new(),
            aggregated: DashMap::new(),
            realtime: DashMap::new(),
            retention: retention.max(1),
        }
    }

    pub fn agent(&self, agent_id: &str) -> Option<AgentRecord> {
        self.agents.get(agent_id).map(|r| r.value().clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FleetStore for MemoryStore {
    async fn load_tracked_agents(&self) -> Result<Vec<AgentRecord>> {
        let mut records: Vec<AgentRecord> = self
            .agents
            .iter()
            .filter(|r| r.state.is_resumable())
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn upsert_metrics(
        &self,
        aggregated: &AggregatedAgentMetrics,
        realtime: &RealtimeAgentMetrics,
    ) -> Result<()> {
        // Holding the record guard keeps a concurrent `remove_agent` from
        // interleaving with the writes below.
        let Some(_record) = self.agents.get(&aggregated.agent_id) else {
            debug!(agent_id = %aggregated.agent_id, "metrics for unregistered agent dropped");
            return Ok(());
        };

        self.aggregated
            .insert(aggregated.agent_id.clone(), aggregated.clone());

        let mut series = self.realtime.entry(realtime.agent_id.clone()).or_default();
        series.push_back(realtime.clone());
        while series.len() > self.retention {
            series.pop_front();
        }
        Ok(())
    }

    async fn update_agent_status(&self, agent_id: &str, state: AgentState) -> Result<()> {
        let Some(mut record) = self.agents.get_mut(agent_id) else {
            debug!(agent_id, "status update for unregistered agent dropped");
            return Ok(());
        };
        record.state = state;

        self.aggregated
            .entry(agent_id.to_string())
            .and_modify(|row| {
                row.status = state;
                row.updated_at = Utc::now();
            })
            .or_insert_with(|| AggregatedAgentMetrics::empty(agent_id, state));
        Ok(())
    }

    async fn register_agent(&self, record: &AgentRecord) -> Result<()> {
        self.agents.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn remove_agent(&self, agent_id: &str) -> Result<()> {
        self.agents.remove(agent_id);
        self.aggregated.remove(agent_id);
        self.realtime.remove(agent_id);
        Ok(())
    }

    async fn aggregated_metrics(&self, agent_id: &str) -> Result<Option<AggregatedAgentMetrics>> {
        Ok(self.aggregated.get(agent_id).map(|r| r.value().clone()))
    }

    async fn realtime_metrics(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<RealtimeAgentMetrics>> {
        Ok(self
            .realtime
            .get(agent_id)
            .map(|series| {
                let skip = series.len().saturating_sub(limit);
                series.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn record(id: &str, state: AgentState) -> AgentRecord {
        let mut record = AgentRecord::new(id, format!("{id}.local"), IpAddr::V4(Ipv4Addr::LOCALHOST));
        record.state = state;
        record
    }

    fn realtime(agent_id: &str, logs: f64) -> RealtimeAgentMetrics {
        RealtimeAgentMetrics {
            agent_id: agent_id.to_string(),
            logs_rate: logs,
            traces_rate: 0.0,
            metrics_rate: 0.0,
            bytes_sent: 0,
            bytes_received: 0,
            cpu_utilization: 0.0,
            memory_bytes: 0,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_disconnected_agents_are_not_resumed() {
        let store = MemoryStore::new();
        tokio_test::block_on(async {
            for (id, state) in [
                ("b", AgentState::Connected),
                ("c", AgentState::Disconnected),
                ("a", AgentState::Unknown),
            ] {
                store.register_agent(&record(id, state)).await.unwrap();
            }
            let ids: Vec<_> = store
                .load_tracked_agents()
                .await
                .unwrap()
                .into_iter()
                .map(|r| r.id)
                .collect();
            assert_eq!(ids, vec!["a", "b"]);
        });
    }

    #[test]
    fn test_status_update_touches_record_and_aggregate() {
        let store = MemoryStore::new();
        tokio_test::block_on(async {
            store
                .register_agent(&record("a1", AgentState::Unknown))
                .await
                .unwrap();
            store
                .update_agent_status("a1", AgentState::Disconnected)
                .await
                .unwrap();

            assert_eq!(store.agent("a1").unwrap().state, AgentState::Disconnected);
            let row = store.aggregated_metrics("a1").await.unwrap().unwrap();
            assert_eq!(row.status, AgentState::Disconnected);
            assert_eq!(row.logs_rate, 0.0);
        });
    }

    #[test]
    fn test_realtime_series_is_capped_and_ordered() {
        let store = MemoryStore::with_retention(3);
        tokio_test::block_on(async {
            store
                .register_agent(&record("a1", AgentState::Connected))
                .await
                .unwrap();
            let aggregated = AggregatedAgentMetrics::empty("a1", AgentState::Connected);
            for i in 0..5 {
                store
                    .upsert_metrics(&aggregated, &realtime("a1", i as f64))
                    .await
                    .unwrap();
            }
            let rows = store.realtime_metrics("a1", 10).await.unwrap();
            let logs: Vec<f64> = rows.iter().map(|r| r.logs_rate).collect();
            assert_eq!(logs, vec![2.0, 3.0, 4.0]);

            let latest = store.realtime_metrics("a1", 1).await.unwrap();
            assert_eq!(latest[0].logs_rate, 4.0);
            assert!(store.realtime_metrics("nobody", 5).await.unwrap().is_empty());
        });
    }

    #[test]
    fn test_writes_for_unregistered_agent_are_dropped() {
        let store = MemoryStore::new();
        tokio_test::block_on(async {
            store
                .register_agent(&record("a1", AgentState::Connected))
                .await
                .unwrap();
            store.remove_agent("a1").await.unwrap();

            let aggregated = AggregatedAgentMetrics::empty("a1", AgentState::Connected);
            store
                .upsert_metrics(&aggregated, &realtime("a1", 1.0))
                .await
                .unwrap();
            store
                .update_agent_status("a1", AgentState::Unknown)
                .await
                .unwrap();

            assert!(store.agent("a1").is_none());
            assert!(store.aggregated_metrics("a1").await.unwrap().is_none());
            assert!(store.realtime_metrics("a1", 10).await.unwrap().is_empty());
        });
    }
}
