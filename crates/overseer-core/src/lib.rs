//! # Overseer Core
//!
//! Core types shared by every Overseer crate: the agent and metrics rows the
//! fleet monitor persists, the pipeline graph the compiler consumes and the
//! compiled configuration it produces, plus configuration and errors.

pub mod agent;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;

pub use agent::{AgentId, AgentRecord, AgentState};
pub use config::{DistributionConfig, MonitorConfig, PlatformConfig};
pub use error::{OverseerError, Result};
pub use metrics::{AggregatedAgentMetrics, RealtimeAgentMetrics};
pub use pipeline::{
    CompiledConfig, ComponentRole, Edge, Node, NodeId, PipelineGraph, PipelineSpec, SignalKind,
    TelemetryConfig,
};

/// Current Overseer version for compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overseer build information for telemetry and debugging
pub const BUILD_INFO: &str = concat!(
    "Overseer ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Standard API endpoints for Overseer services
pub mod endpoints {
    pub const HEALTH: &str = "/health";
    pub const METRICS: &str = "/metrics";
    pub const API_V1_AGENTS: &str = "/api/v1/agents";
    pub const API_V1_AGENT: &str = "/api/v1/agents/{id}";
    pub const API_V1_AGENT_METRICS: &str = "/api/v1/agents/{id}/metrics";
    pub const API_V1_PIPELINES: &str = "/api/v1/pipelines";
    pub const API_V1_PIPELINES_COMPILE: &str = "/api/v1/pipelines/compile";
    pub const API_V1_PIPELINES_DEPLOY: &str = "/api/v1/pipelines/deploy";
}
