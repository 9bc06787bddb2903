//! Platform configuration
//!
//! TOML file with a default for every field. A minimal config is empty:
//!
//! ```toml
//! listen = "0.0.0.0:8081"
//!
//! [monitor]
//! workers = 4
//! interval_secs = 30
//!
//! [[agents]]
//! id = "edge-1"
//! hostname = "edge-1.local"
//! ip = "10.0.0.5"
//! ```

use crate::agent::AgentRecord;
use crate::error::{OverseerError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound and default for [`MonitorConfig::max_retries`].
pub const MAX_RETRIES: u8 = 3;

/// Fleet health monitor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Number of concurrent health-check workers
    pub workers: usize,
    /// Time between two checks of the same agent
    pub interval_secs: u64,
    /// Scheduler scan period
    pub tick_millis: u64,
    /// Per-request timeout for a metrics scrape
    pub request_timeout_millis: u64,
    /// Consecutive failures before an agent is declared disconnected,
    /// at most [`MAX_RETRIES`]
    pub max_retries: u8,
    pub metrics_port: u16,
    pub metrics_path: String,
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_millis)
    }

    /// Work queue capacity, twice the worker count.
    pub fn queue_capacity(&self) -> usize {
        self.workers * 2
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(OverseerError::invalid_config("monitor.workers must be >= 1"));
        }
        if self.interval_secs == 0 {
            return Err(OverseerError::invalid_config(
                "monitor.interval_secs must be >= 1",
            ));
        }
        if self.tick_millis == 0 {
            return Err(OverseerError::invalid_config(
                "monitor.tick_millis must be >= 1",
            ));
        }
        if !(1..=MAX_RETRIES).contains(&self.max_retries) {
            return Err(OverseerError::invalid_config(format!(
                "monitor.max_retries must be between 1 and {MAX_RETRIES}"
            )));
        }
        if !self.metrics_path.starts_with('/') {
            return Err(OverseerError::invalid_config(
                "monitor.metrics_path must start with '/'",
            ));
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            interval_secs: 30,
            tick_millis: 1000,
            request_timeout_millis: 2000,
            max_retries: MAX_RETRIES,
            metrics_port: 8888,
            metrics_path: "/metrics".to_string(),
        }
    }
}

/// Where compiled configs are pushed on each agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    pub config_port: u16,
    pub config_path: String,
    pub timeout_millis: u64,
}

impl DistributionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            config_port: 4321,
            config_path: "/config".to_string(),
            timeout_millis: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub listen: SocketAddr,
    /// Default tracing filter; `RUST_LOG` takes precedence
    pub log_level: String,
    pub monitor: MonitorConfig,
    pub distribution: DistributionConfig,
    /// Agents seeded into the store at startup
    pub agents: Vec<AgentRecord>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8081)),
            log_level: "info".to_string(),
            monitor: MonitorConfig::default(),
            distribution: DistributionConfig::default(),
            agents: Vec::new(),
        }
    }
}

impl PlatformConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            OverseerError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        text.parse()
    }

    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()?;
        if !self.distribution.config_path.starts_with('/') {
            return Err(OverseerError::invalid_config(
                "distribution.config_path must start with '/'",
            ));
        }
        Ok(())
    }
}

impl FromStr for PlatformConfig {
    type Err = OverseerError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| OverseerError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
