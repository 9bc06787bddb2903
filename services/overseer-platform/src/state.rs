//! Shared platform state

use crate::distribution::{Distributor, PushOutcome};
use chrono::{DateTime, Utc};
use fleet_monitor::{FleetHealthMonitor, FleetStore};
use overseer_core::{AgentId, PipelineGraph};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A compiled pipeline that was pushed to a set of agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: Uuid,
    pub name: String,
    pub graph: PipelineGraph,
    pub agent_ids: Vec<AgentId>,
    pub outcomes: Vec<PushOutcome>,
    pub deployed_at: DateTime<Utc>,
}

impl Deployment {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.delivered).count()
    }
}

pub struct AppState {
    pub monitor: Arc<FleetHealthMonitor>,
    pub store: Arc<dyn FleetStore>,
    pub distributor: Distributor,
    deployments: RwLock<Vec<Deployment>>,
    pub started_at: DateTime<Utc>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("monitor", &self.monitor)
            .field("deployments", &self.deployment_count())
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl AppState {
    pub fn new(
        monitor: Arc<FleetHealthMonitor>,
        store: Arc<dyn FleetStore>,
        distributor: Distributor,
    ) -> Self {
        Self {
            monitor,
            store,
            distributor,
            deployments: RwLock::new(Vec::new()),
            started_at: Utc::now(),
        }
    }

    pub fn record_deployment(&self, deployment: Deployment) {
        self.deployments.write().push(deployment);
    }

    /// Deployments, oldest first.
    pub fn deployments(&self) -> Vec<Deployment> {
        self.deployments.read().clone()
    }

    pub fn deployment_count(&self) -> usize {
        self.deployments.read().len()
    }
}
