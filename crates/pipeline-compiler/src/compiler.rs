//! Pipeline Graph Compiler
//!
//! Every connected component of the (undirected) graph becomes one pipeline.
//! Data-flow direction inside a pipeline comes from each node's role, not
//! from edge direction. The compiler is a pure function: no I/O, no shared
//! state, safe to call concurrently.

use crate::alias;
use overseer_core::{
    CompiledConfig, ComponentRole, Node, OverseerError, PipelineGraph, PipelineSpec, Result,
    SignalKind,
};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::{debug, instrument};

/// Compile a graph into collector configuration.
///
/// Fails without partial output on an empty graph, a duplicate node id, an
/// edge to a missing node, or a node whose role is not receiver, processor
/// or exporter.
#[instrument(skip(graph), fields(nodes = graph.nodes.len(), edges = graph.edges.len()))]
pub fn compile(graph: &PipelineGraph) -> Result<CompiledConfig> {
    let nodes = &graph.nodes;
    if nodes.is_empty() {
        return Err(OverseerError::EmptyGraph);
    }

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if index.insert(node.id.as_str(), i).is_some() {
            return Err(OverseerError::DuplicateNode {
                node_id: node.id.clone(),
            });
        }
    }

    let roles = nodes
        .iter()
        .map(|node| {
            ComponentRole::parse(&node.role).ok_or_else(|| OverseerError::UnknownComponentRole {
                node_id: node.id.clone(),
                role: node.role.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let aliases = alias::assign(nodes, &roles);
    let adjacency = build_adjacency(graph, &index)?;

    let mut config = CompiledConfig::default();
    for (number, component) in connected_components(&adjacency).iter().enumerate() {
        let mut spec = PipelineSpec::default();

        for &i in component {
            let alias = aliases[i].clone();
            let payload = component_payload(&nodes[i]);
            let (components, list) = match roles[i] {
                ComponentRole::Receiver => (&mut config.receivers, &mut spec.receivers),
                ComponentRole::Processor => (&mut config.processors, &mut spec.processors),
                ComponentRole::Exporter => (&mut config.exporters, &mut spec.exporters),
            };
            components.insert(alias.clone(), payload);
            list.push(alias);
        }

        let signal = pipeline_signal(component.iter().map(|&i| &nodes[i]));
        let name = format!("{}/pipeline{}", signal.as_str(), number + 1);
        debug!(pipeline = %name, components = spec.len(), "compiled pipeline");
        config.pipelines.insert(name, spec);
    }

    Ok(config)
}

/// Undirected adjacency list; every edge contributes both directions.
fn build_adjacency(graph: &PipelineGraph, index: &HashMap<&str, usize>) -> Result<Vec<Vec<usize>>> {
    let lookup = |id: &str| {
        index
            .get(id)
            .copied()
            .ok_or_else(|| OverseerError::UnknownNode {
                node_id: id.to_string(),
            })
    };

    let mut adjacency = vec![Vec::new(); graph.nodes.len()];
    for edge in &graph.edges {
        let source = lookup(&edge.source)?;
        let target = lookup(&edge.target)?;
        adjacency[source].push(target);
        if source != target {
            adjacency[target].push(source);
        }
    }
    Ok(adjacency)
}

/// Breadth-first discovery of connected components, starting from each
/// unvisited node in input order. Nodes are marked on enqueue.
fn connected_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut visited = vec![false; adjacency.len()];
    let mut components = Vec::new();

    for start in 0..adjacency.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;

        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            component.push(current);
            for &next in &adjacency[current] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
        components.push(component);
    }
    components
}

/// Collectors want a mapping for every component, even an unconfigured one.
fn component_payload(node: &Node) -> serde_json::Value {
    match &node.config {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other.clone(),
    }
}

/// First signal supported by every node that declares any; traces otherwise.
fn pipeline_signal<'a>(nodes: impl Iterator<Item = &'a Node>) -> SignalKind {
    let mut shared: Option<BTreeSet<SignalKind>> = None;
    for node in nodes.filter(|n| !n.signals.is_empty()) {
        let signals: BTreeSet<SignalKind> = node.signals.iter().copied().collect();
        shared = Some(match shared {
            None => signals,
            Some(acc) => acc.intersection(&signals).copied().collect(),
        });
    }
    shared
        .and_then(|set| set.into_iter().next())
        .unwrap_or(SignalKind::Traces)
}
