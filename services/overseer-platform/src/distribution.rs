//! Pushing compiled collector configuration to agents
//!
//! Each agent gets one `PUT` of the rendered YAML, by hostname first and by
//! IP address if that fails. There are no retries; the caller gets one
//! outcome per agent.

use fleet_monitor::AgentStatus;
use overseer_core::agent::url_host;
use overseer_core::{AgentId, DistributionConfig, OverseerError, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

/// Result of pushing a config to one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcome {
    pub agent_id: AgentId,
    pub delivered: bool,
    /// Endpoint that accepted the config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PushOutcome {
    pub fn delivered(agent_id: impl Into<AgentId>, endpoint: String) -> Self {
        Self {
            agent_id: agent_id.into(),
            delivered: true,
            endpoint: Some(endpoint),
            error: None,
        }
    }

    pub fn failed(agent_id: impl Into<AgentId>, error: &OverseerError) -> Self {
        Self {
            agent_id: agent_id.into(),
            delivered: false,
            endpoint: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Distributor {
    client: reqwest::Client,
    port: u16,
    path: String,
}

impl Distributor {
    pub fn new(config: &DistributionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| OverseerError::invalid_config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            port: config.config_port,
            path: config.config_path.clone(),
        })
    }

    pub fn endpoint(&self, host: &str) -> String {
        format!("http://{}:{}{}", host, self.port, self.path)
    }

    async fn put(&self, url: &str, yaml: &str) -> reqwest::Result<()> {
        self.client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/yaml")
            .body(yaml.to_string())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Push to one agent. Returns the endpoint that accepted the config.
    #[instrument(skip(self, target, yaml), fields(agent_id = %target.id))]
    pub async fn push(&self, target: &AgentStatus, yaml: &str) -> Result<String> {
        let by_name = self.endpoint(&target.hostname);
        let first = match self.put(&by_name, yaml).await {
            Ok(()) => return Ok(by_name),
            Err(e) => e,
        };
        debug!(endpoint = %by_name, error = %first, "Config push by hostname failed, trying ip");

        let by_ip = self.endpoint(&url_host(&target.ip));
        self.put(&by_ip, yaml)
            .await
            .map(|()| by_ip)
            .map_err(|e| OverseerError::Distribution {
                agent_id: target.id.clone(),
                reason: format!("hostname: {first}; ip: {e}"),
            })
    }

    /// Push to every target concurrently. Outcomes keep the target order.
    pub async fn distribute(&self, targets: Vec<AgentStatus>, yaml: &str) -> Vec<PushOutcome> {
        let mut pushes = JoinSet::new();
        for (index, target) in targets.into_iter().enumerate() {
            let distributor = self.clone();
            let yaml = yaml.to_string();
            pushes.spawn(async move {
                let outcome = match distributor.push(&target, &yaml).await {
                    Ok(endpoint) => PushOutcome::delivered(target.id.clone(), endpoint),
                    Err(e) => {
                        warn!(agent_id = %target.id, error = %e, "Config push failed");
                        PushOutcome::failed(target.id.clone(), &e)
                    }
                };
                (index, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(pushes.len());
        while let Some(joined) = pushes.join_next().await {
            match joined {
                Ok(done) => outcomes.push(done),
                Err(e) => warn!(error = %e, "Config push task aborted"),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let outcomes: Vec<PushOutcome> = outcomes.into_iter().map(|(_, o)| o).collect();
        info!(
            delivered = outcomes.iter().filter(|o| o.delivered).count(),
            total = outcomes.len(),
            "Config distribution finished"
        );
        outcomes
    }
}
