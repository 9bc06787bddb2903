//! In-memory roster of monitored agents

use agent_metrics::CollectorSample;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use overseer_core::{AgentId, AgentState, OverseerError, Result};
use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;

/// Mutable monitoring state of one agent.
///
/// Invariant: `retries_remaining` stays within `[0, max_retries]` and the
/// state is `Disconnected` exactly when it has reached zero since the last
/// successful check.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub id: AgentId,
    pub hostname: String,
    pub ip: IpAddr,
    pub state: AgentState,
    pub retries_remaining: u8,
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub next_check: Instant,
    /// Registration generation; a check only reports into the entry it
    /// was started for.
    #[serde(skip)]
    pub(crate) epoch: u64,
    #[serde(skip)]
    pub(crate) last_sample: Option<(CollectorSample, Instant)>,
}

impl AgentStatus {
    pub(crate) fn new(
        id: AgentId,
        hostname: String,
        ip: IpAddr,
        retries: u8,
        epoch: u64,
        now: Instant,
    ) -> Self {
        Self {
            id,
            hostname,
            ip,
            state: AgentState::Unknown,
            retries_remaining: retries,
            last_checked: None,
            next_check: now,
            epoch,
            last_sample: None,
        }
    }

    pub(crate) fn record_success(&mut self, max_retries: u8) {
        self.retries_remaining = max_retries;
        self.state = AgentState::Connected;
        self.last_checked = Some(Utc::now());
    }

    pub(crate) fn record_failure(&mut self) {
        self.retries_remaining = self.retries_remaining.saturating_sub(1);
        self.state = if self.retries_remaining == 0 {
            AgentState::Disconnected
        } else {
            AgentState::Unknown
        };
        self.last_checked = Some(Utc::now());
    }
}

/// Concurrency-safe agent table. Every operation locks at most one shard
/// for its duration, so a removal racing an in-flight check is harmless.
#[derive(Debug, Default)]
pub struct Roster {
    agents: DashMap<AgentId, AgentStatus>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry; an existing entry is left untouched.
    pub fn insert_new(&self, status: AgentStatus) -> Result<()> {
        match self.agents.entry(status.id.clone()) {
            Entry::Occupied(_) => Err(OverseerError::duplicate_agent(status.id)),
            Entry::Vacant(slot) => {
                slot.insert(status);
                Ok(())
            }
        }
    }

    pub fn remove(&self, agent_id: &str) -> Option<AgentStatus> {
        self.agents.remove(agent_id).map(|(_, status)| status)
    }

    /// Remove only if the entry still belongs to registration `epoch` and
    /// has exhausted its retries.
    pub(crate) fn remove_exhausted(&self, agent_id: &str, epoch: u64) -> bool {
        self.agents
            .remove_if(agent_id, |_, s| s.epoch == epoch && s.retries_remaining == 0)
            .is_some()
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentStatus> {
        self.agents.get(agent_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    /// Whether `agent_id` is still tracked under registration `epoch`.
    pub(crate) fn is_current(&self, agent_id: &str, epoch: u64) -> bool {
        self.agents
            .get(agent_id)
            .is_some_and(|entry| entry.epoch == epoch)
    }

    /// Mutate an entry if it still belongs to registration `epoch`.
    pub(crate) fn update<R>(
        &self,
        agent_id: &str,
        epoch: u64,
        f: impl FnOnce(&mut AgentStatus) -> R,
    ) -> Option<R> {
        let mut entry = self.agents.get_mut(agent_id)?;
        if entry.epoch != epoch {
            return None;
        }
        Some(f(entry.value_mut()))
    }

    /// Entries sorted by agent id.
    pub fn snapshot(&self) -> Vec<AgentStatus> {
        let mut agents: Vec<AgentStatus> =
            self.agents.iter().map(|entry| entry.value().clone()).collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Offer every due agent to `enqueue`. An accepted agent has its next
    /// check pushed out by `interval` right away; a refused one stays due
    /// and is offered again on the next scan.
    pub(crate) fn schedule_due(
        &self,
        now: Instant,
        interval: Duration,
        mut enqueue: impl FnMut(&AgentId) -> bool,
    ) -> (usize, usize) {
        let (mut queued, mut skipped) = (0, 0);
        for mut entry in self.agents.iter_mut() {
            if entry.next_check > now {
                continue;
            }
            if enqueue(entry.key()) {
                entry.next_check = now + interval;
                queued += 1;
            } else {
                skipped += 1;
            }
        }
        (queued, skipped)
    }
}
