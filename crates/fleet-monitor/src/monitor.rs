//! Fleet Health Monitor
//!
//! One scheduler task scans the roster every tick and offers due agents to a
//! bounded queue (capacity 2N); N worker tasks drain it and run health
//! checks. Queueing never blocks the scheduler: when the queue is full the
//! agent stays due and is offered again on the next tick.
//!
//! An agent's next check is pushed out when it is queued, not when its check
//! completes. A check slower than the interval can therefore overlap the
//! next slot for the same agent; results are applied per entry, so the
//! overlap only costs a redundant scrape.

use crate::health::{self, Throughput};
use crate::roster::{AgentStatus, Roster};
use crate::store::FleetStore;
use agent_metrics::MetricsSource;
use chrono::Utc;
use overseer_core::{AgentId, AgentState, MonitorConfig, OverseerError, Result};
use parking_lot::Mutex;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Outcome of one scheduler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub queued: usize,
    pub skipped: usize,
}

pub struct FleetHealthMonitor {
    roster: Roster,
    store: Arc<dyn FleetStore>,
    source: Arc<dyn MetricsSource>,
    config: MonitorConfig,
    queue: mpsc::Sender<AgentId>,
    receiver: Mutex<Option<mpsc::Receiver<AgentId>>>,
    epochs: AtomicU64,
}

impl std::fmt::Debug for FleetHealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetHealthMonitor")
            .field("tracked_agents", &self.roster.len())
            .field("workers", &self.config.workers)
            .field("queue_capacity", &self.config.queue_capacity())
            .field("started", &self.receiver.lock().is_none())
            .finish()
    }
}

impl FleetHealthMonitor {
    pub fn new(
        config: MonitorConfig,
        store: Arc<dyn FleetStore>,
        source: Arc<dyn MetricsSource>,
    ) -> Result<Self> {
        config.validate()?;
        let (queue, receiver) = mpsc::channel(config.queue_capacity());
        info!(
            workers = config.workers,
            interval_secs = config.interval_secs,
            "Initializing fleet health monitor"
        );
        Ok(Self {
            roster: Roster::new(),
            store,
            source,
            config,
            queue,
            receiver: Mutex::new(Some(receiver)),
            epochs: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start monitoring an agent. It is due for its first check right away.
    #[instrument(skip(self, hostname, ip))]
    pub fn add_agent(&self, agent_id: &str, hostname: &str, ip: IpAddr) -> Result<()> {
        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed);
        let status = AgentStatus::new(
            agent_id.to_string(),
            hostname.to_string(),
            ip,
            self.config.max_retries,
            epoch,
            Instant::now(),
        );
        self.roster.insert_new(status)?;
        info!(hostname, %ip, "Agent added to monitoring");
        Ok(())
    }

    /// Stop monitoring an agent. Unknown ids are ignored.
    pub fn remove_agent(&self, agent_id: &str) {
        if self.roster.remove(agent_id).is_some() {
            info!(agent_id, "Agent removed from monitoring");
        }
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<AgentStatus> {
        self.roster
            .get(agent_id)
            .ok_or_else(|| OverseerError::agent_not_found(agent_id))
    }

    pub fn list_agents(&self) -> Vec<AgentStatus> {
        self.roster.snapshot()
    }

    pub fn tracked(&self) -> usize {
        self.roster.len()
    }

    /// Re-add every agent the store still considers live. A bad or
    /// duplicate row is logged and skipped; returns how many were added.
    #[instrument(skip(self))]
    pub async fn refresh_monitoring(&self) -> Result<usize> {
        let records = self.store.load_tracked_agents().await?;
        let mut added = 0;

        for record in records {
            if record.id.trim().is_empty() || record.hostname.trim().is_empty() {
                warn!(?record, "Skipping stored agent with empty id or hostname");
                continue;
            }
            match self.add_agent(&record.id, &record.hostname, record.ip) {
                Ok(()) => added += 1,
                Err(OverseerError::DuplicateAgent { agent_id }) => {
                    debug!(%agent_id, "Stored agent already monitored")
                }
                Err(e) => warn!(agent_id = %record.id, error = %e, "Failed to resume agent"),
            }
        }

        info!(added, "Monitoring refreshed from store");
        Ok(added)
    }

    /// One scheduler pass: offer every due agent to the work queue.
    pub fn tick(&self) -> TickReport {
        let now = Instant::now();
        let (queued, skipped) =
            self.roster
                .schedule_due(now, self.config.interval(), |agent_id| {
                    match self.queue.try_send(agent_id.clone()) {
                        Ok(()) => true,
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            debug!(%agent_id, "Work queue full, deferring agent to next tick");
                            false
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => false,
                    }
                });

        if skipped > 0 {
            warn!(queued, skipped, "Work queue saturated during scheduler tick");
        }
        TickReport { queued, skipped }
    }

    /// Worker logic for one dequeued agent. Returns the agent's new state,
    /// or `None` if it stopped being tracked before or during the check.
    #[instrument(skip(self))]
    pub async fn check_agent(&self, agent_id: &str) -> Option<AgentState> {
        let Some(target) = self.roster.get(agent_id) else {
            debug!("Agent no longer tracked, skipping check");
            return None;
        };

        let outcome = health::scrape(self.source.as_ref(), &target).await;
        let now = Instant::now();
        let max_retries = self.config.max_retries;

        let applied = self.roster.update(agent_id, target.epoch, |status| match &outcome {
            Ok(sample) => {
                let previous = status.last_sample.as_ref().map(|(s, at)| (s, *at));
                let throughput = Throughput::between(previous, sample, now);
                status.last_sample = Some((*sample, now));
                status.record_success(max_retries);
                let rows = health::metrics_rows(&status.id, sample, throughput, Utc::now());
                (status.state, status.retries_remaining, Some(rows))
            }
            Err(_) => {
                status.record_failure();
                (status.state, status.retries_remaining, None)
            }
        });

        let Some((state, retries_remaining, rows)) = applied else {
            debug!("Agent removed during check, dropping result");
            return None;
        };

        // Each write re-checks the entry: a removal may land while the
        // previous write is in flight.
        if let Some((aggregated, realtime)) = rows {
            if !self.roster.is_current(agent_id, target.epoch) {
                debug!("Agent removed before metrics were persisted, dropping result");
                return None;
            }
            if let Err(e) = self.store.upsert_metrics(&aggregated, &realtime).await {
                error!(error = %e, "Failed to persist agent metrics");
            }
        }
        if !self.roster.is_current(agent_id, target.epoch) {
            debug!("Agent removed before status was persisted, dropping result");
            return None;
        }
        if let Err(e) = self.store.update_agent_status(agent_id, state).await {
            error!(error = %e, state = %state, "Failed to persist agent status");
        }

        match state {
            AgentState::Connected => debug!("Agent healthy"),
            _ => warn!(retries_remaining, state = %state, "Agent health check failed"),
        }

        if retries_remaining == 0 && self.roster.remove_exhausted(agent_id, target.epoch) {
            warn!("Agent disconnected after exhausting retries, monitoring stopped");
        }

        Some(state)
    }

    /// Spawn the scheduler and the worker pool.
    pub fn start(self: &Arc<Self>) -> Result<MonitorHandle> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or_else(|| OverseerError::invalid_config("fleet monitor already started"))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared_rx = Arc::new(tokio::sync::Mutex::new(receiver));
        let mut tasks = Vec::with_capacity(self.config.workers + 1);

        for worker_id in 0..self.config.workers {
            let monitor = Arc::clone(self);
            let rx = Arc::clone(&shared_rx);
            let mut shutdown = shutdown_rx.clone();

            tasks.push(tokio::spawn(async move {
                debug!(worker_id, "Health check worker started");
                loop {
                    let next = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            _ = shutdown.changed() => None,
                            agent_id = rx.recv() => agent_id,
                        }
                    };
                    let Some(agent_id) = next else { break };
                    monitor.check_agent(&agent_id).await;
                }
                debug!(worker_id, "Health check worker stopped");
            }));
        }

        let monitor = Arc::clone(self);
        let mut shutdown = shutdown_rx;
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.config.tick());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.tick();
                    }
                    _ = shutdown.changed() => break,
                }
            }
            debug!("Scheduler stopped");
        }));

        info!(workers = self.config.workers, "Fleet health monitor started");
        Ok(MonitorHandle {
            shutdown: shutdown_tx,
            tasks,
        })
    }
}

/// Running scheduler and workers. In-flight checks finish before
/// `shutdown` returns.
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl MonitorHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Monitor task ended abnormally");
            }
        }
        info!("Fleet health monitor stopped");
    }
}
