pub use overseer_core;

mod alias;
mod compiler;
mod render;

pub use alias::{alias_for, camel_case, type_prefix};
pub use compiler::compile;
pub use render::RenderCollector;

// Re-export core types for convenience
pub use overseer_core::{
    CompiledConfig, ComponentRole, Edge, Node, NodeId, OverseerError, PipelineGraph, PipelineSpec,
    Result, SignalKind,
};
