//! HTTP metrics client

use crate::exposition::{parse_exposition, MetricSet};
use async_trait::async_trait;
use overseer_core::{MonitorConfig, OverseerError, Result};
use std::time::Duration;
use tracing::{debug, instrument};

/// Where the fleet monitor gets an agent's metrics from.
///
/// `host` is either a hostname or a URL-ready IP address; the source knows
/// the port and path.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch(&self, host: &str) -> Result<MetricSet>;
}

/// Scrapes `http://{host}:{port}{path}` with a per-request timeout. A slow
/// agent is treated exactly like an unreachable one.
#[derive(Debug, Clone)]
pub struct HttpMetricsClient {
    client: reqwest::Client,
    port: u16,
    path: String,
}

impl HttpMetricsClient {
    pub fn new(port: u16, path: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| OverseerError::invalid_config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            port,
            path: path.into(),
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        Self::new(
            config.metrics_port,
            config.metrics_path.clone(),
            config.request_timeout(),
        )
    }

    pub fn endpoint(&self, host: &str) -> String {
        format!("http://{}:{}{}", host, self.port, self.path)
    }

    /// GET an exposition payload from an explicit URL.
    #[instrument(skip(self))]
    pub async fn fetch_url(&self, url: &str) -> Result<MetricSet> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OverseerError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OverseerError::fetch(url, format!("status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OverseerError::fetch(url, e))?;
        let set = parse_exposition(&body).map_err(|e| OverseerError::fetch(url, e))?;
        debug!(metrics = set.len(), "scraped agent metrics");
        Ok(set)
    }
}

#[async_trait]
impl MetricsSource for HttpMetricsClient {
    async fn fetch(&self, host: &str) -> Result<MetricSet> {
        self.fetch_url(&self.endpoint(host)).await
    }
}
