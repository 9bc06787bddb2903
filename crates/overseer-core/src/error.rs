//! Error types for the Overseer control plane

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OverseerError>;

#[derive(Error, Debug)]
pub enum OverseerError {
    #[error("Agent already tracked: {agent_id}")]
    DuplicateAgent { agent_id: String },

    #[error("Agent not found: {agent_id}")]
    AgentNotFound { agent_id: String },

    #[error("Agent unreachable: {agent_id} (hostname and ip both failed)")]
    UnreachableAgent { agent_id: String },

    #[error("Unknown component role '{role}' on node {node_id}")]
    UnknownComponentRole { node_id: String, role: String },

    #[error("Edge references unknown node: {node_id}")]
    UnknownNode { node_id: String },

    #[error("Duplicate node identifier: {node_id}")]
    DuplicateNode { node_id: String },

    #[error("Pipeline graph has no nodes")]
    EmptyGraph,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Storage operation failed: {reason}")]
    Storage { reason: String },

    #[error("Metrics fetch from {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Config push to agent {agent_id} failed: {reason}")]
    Distribution { agent_id: String, reason: String },

    #[error("Rendering failed: {reason}")]
    Render { reason: String },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },
}

impl OverseerError {
    pub fn duplicate_agent(agent_id: impl Into<String>) -> Self {
        Self::DuplicateAgent {
            agent_id: agent_id.into(),
        }
    }

    pub fn agent_not_found(agent_id: impl Into<String>) -> Self {
        Self::AgentNotFound {
            agent_id: agent_id.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors caused by a malformed pipeline graph. These are the caller's
    /// fault and never leave a partial result behind.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownComponentRole { .. }
                | Self::UnknownNode { .. }
                | Self::DuplicateNode { .. }
                | Self::EmptyGraph
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_identifiers() {
        let err = OverseerError::duplicate_agent("a1");
        assert!(err.to_string().contains("a1"));

        let err = OverseerError::UnknownComponentRole {
            node_id: "7".to_string(),
            role: "foo".to_string(),
        };
        assert!(err.to_string().contains("foo"));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_graph_error_classification() {
        assert!(OverseerError::EmptyGraph.is_graph_error());
        assert!(OverseerError::UnknownNode {
            node_id: "x".to_string()
        }
        .is_graph_error());
        assert!(!OverseerError::agent_not_found("a1").is_graph_error());
        assert!(!OverseerError::storage("disk full").is_graph_error());
    }
}
