//! Agent types

use crate::error::OverseerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

pub type AgentId = String;

/// Liveness of an agent as seen by the fleet monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }

    /// Whether monitoring resumes for an agent last seen in this state.
    pub fn is_resumable(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentState {
    type Err = OverseerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "connected" => Ok(Self::Connected),
            "disconnected" => Ok(Self::Disconnected),
            other => Err(OverseerError::invalid_config(format!(
                "unknown agent state '{other}'"
            ))),
        }
    }
}

/// Durable view of a registered agent, as kept by the storage port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub hostname: String,
    pub ip: IpAddr,
    #[serde(default)]
    pub state: AgentState,
}

impl AgentRecord {
    pub fn new(id: impl Into<AgentId>, hostname: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            id: id.into(),
            hostname: hostname.into(),
            ip,
            state: AgentState::Unknown,
        }
    }
}

/// Render an IP address for the host part of a URL (IPv6 gets brackets).
pub fn url_host(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{v6}]"),
    }
}
