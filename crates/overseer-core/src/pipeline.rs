//! Pipeline graph and compiled collector configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type NodeId = String;

/// Role a component plays inside a collector pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentRole {
    Receiver,
    Processor,
    Exporter,
}

impl ComponentRole {
    /// Case-insensitive match against the role names the editor emits.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "receiver" => Some(Self::Receiver),
            "processor" => Some(Self::Processor),
            "exporter" => Some(Self::Exporter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receiver => "receiver",
            Self::Processor => "processor",
            Self::Exporter => "exporter",
        }
    }
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Telemetry signal a component can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Traces,
    Metrics,
    Logs,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Traces => "traces",
            Self::Metrics => "metrics",
            Self::Logs => "logs",
        }
    }
}

/// A component placed on the editor canvas.
///
/// `role` stays a raw string so that the compiler, not deserialization,
/// decides what an unknown role means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub role: String,
    #[serde(rename = "type")]
    pub component_type: String,
    /// Component configuration, passed through to the collector untouched
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub signals: Vec<SignalKind>,
}

impl Node {
    pub fn new(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        role: impl Into<String>,
        component_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
            component_type: component_type.into(),
            config: serde_json::Value::Null,
            signals: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_signals(mut self, signals: impl IntoIterator<Item = SignalKind>) -> Self {
        self.signals = signals.into_iter().collect();
        self
    }
}

/// Connection between two nodes. Direction is ignored for grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineGraph {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl PipelineGraph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }
}

/// Component aliases of one pipeline, in the order they were visited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub receivers: Vec<String>,
    pub processors: Vec<String>,
    pub exporters: Vec<String>,
}

impl PipelineSpec {
    pub fn len(&self) -> usize {
        self.receivers.len() + self.processors.len() + self.exporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryMetrics {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryLogs {
    pub level: String,
}

/// Self-observability stanza every compiled config carries. The metrics
/// address is where the fleet monitor scrapes the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub metrics: TelemetryMetrics,
    pub logs: TelemetryLogs,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics: TelemetryMetrics {
                address: "0.0.0.0:8888".to_string(),
            },
            logs: TelemetryLogs {
                level: "info".to_string(),
            },
        }
    }
}

/// Output of the pipeline compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledConfig {
    pub receivers: BTreeMap<String, serde_json::Value>,
    pub processors: BTreeMap<String, serde_json::Value>,
    pub exporters: BTreeMap<String, serde_json::Value>,
    pub pipelines: BTreeMap<String, PipelineSpec>,
    pub telemetry: TelemetryConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(ComponentRole::parse("Receiver"), Some(ComponentRole::Receiver));
        assert_eq!(ComponentRole::parse(" exporter "), Some(ComponentRole::Exporter));
        assert_eq!(ComponentRole::parse("foo"), None);
    }

    #[test]
    fn test_node_deserializes_with_defaults() {
        let json = r#"{"id":"1","name":"OTLP In","role":"receiver","type":"otlp"}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.component_type, "otlp");
        assert!(node.config.is_null());
        assert!(node.signals.is_empty());
    }

    #[test]
    fn test_graph_edges_are_optional() {
        let json = r#"{"nodes":[{"id":"1","name":"a","role":"receiver","type":"otlp"}]}"#;
        let graph: PipelineGraph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
    }
}
