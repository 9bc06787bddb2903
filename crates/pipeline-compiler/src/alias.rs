//! Component alias generation
//!
//! An alias is `<type prefix>/<camelCased display name>`, e.g. a node of
//! type `otlp_grpc` named "Edge Ingest" becomes `otlp/edgeIngest`.

use overseer_core::{ComponentRole, Node};
use std::collections::{HashMap, HashSet};

/// Component type truncated before its first underscore.
pub fn type_prefix(component_type: &str) -> &str {
    let trimmed = component_type.trim();
    match trimmed.find('_') {
        Some(0) | None => trimmed,
        Some(pos) => &trimmed[..pos],
    }
}

/// Split on anything that is not alphanumeric, lower-case the first word,
/// capitalise the rest.
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let words = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty());

    for (i, word) in words.enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Alias for a single node, before collision handling.
pub fn alias_for(node: &Node) -> String {
    let mut name = camel_case(&node.name);
    if name.is_empty() {
        name = camel_case(&node.id);
    }
    if name.is_empty() {
        return type_prefix(&node.component_type).to_string();
    }
    format!("{}/{}", type_prefix(&node.component_type), name)
}

/// Aliases for every node, indexed like `nodes`. Two nodes of the same role
/// that would share an alias get `_2`, `_3`, ... in node order.
pub(crate) fn assign(nodes: &[Node], roles: &[ComponentRole]) -> Vec<String> {
    let mut taken: HashMap<ComponentRole, HashSet<String>> = HashMap::new();
    let mut aliases = Vec::with_capacity(nodes.len());

    for (node, role) in nodes.iter().zip(roles) {
        let base = alias_for(node);
        let used = taken.entry(*role).or_default();

        let mut candidate = base.clone();
        let mut suffix = 2;
        while used.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        used.insert(candidate.clone());
        aliases.push(candidate);
    }
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_prefix() {
        assert_eq!(type_prefix("otlp"), "otlp");
        assert_eq!(type_prefix("otlp_grpc"), "otlp");
        assert_eq!(type_prefix("prometheus_remote_write"), "prometheus");
        assert_eq!(type_prefix("_odd"), "_odd");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("Edge Ingest"), "edgeIngest");
        assert_eq!(camel_case("OTLP-in  v2"), "otlpInV2");
        assert_eq!(camel_case("batch"), "batch");
        assert_eq!(camel_case("  "), "");
    }

    #[test]
    fn test_alias_falls_back_to_node_id() {
        let node = Node::new("node-7", "!!", "receiver", "otlp");
        assert_eq!(alias_for(&node), "otlp/node7");
    }

    #[test]
    fn test_colliding_aliases_are_suffixed_per_role() {
        let nodes = vec![
            Node::new("1", "Main", "receiver", "otlp"),
            Node::new("2", "main", "receiver", "otlp_http"),
            Node::new("3", "MAIN", "exporter", "otlp"),
        ];
        let roles = vec![
            ComponentRole::Receiver,
            ComponentRole::Receiver,
            ComponentRole::Exporter,
        ];
        let aliases = assign(&nodes, &roles);
        assert_eq!(aliases, vec!["otlp/main", "otlp/main_2", "otlp/main"]);
    }
}
