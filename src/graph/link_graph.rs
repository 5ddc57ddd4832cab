//! Link graph — petgraph wrapper over the registry's adjacency.
//!
//! Built from the node registry's own `links` lists plus the recommendation
//! engine's output. The `id_to_index` map enables O(1) lookups by node ID,
//! which is what route discovery traverses.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

use crate::links::LinkRecommendation;
use crate::registry::Registry;

/// A node as seen by route discovery.
#[derive(Debug, Clone)]
pub struct RouteNode {
    pub id: String,
    pub cluster: Option<String>,
    pub resonance_score: f64,
}

/// An edge in the link graph.
#[derive(Debug, Clone)]
pub struct RouteEdge {
    pub weight: f64,
}

impl Default for RouteEdge {
    fn default() -> Self {
        Self { weight: 1.0 }
    }
}

/// Wrapper around `petgraph::DiGraph` with bidirectional ID ↔ NodeIndex
/// mapping.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    pub graph: DiGraph<RouteNode, RouteEdge>,
    id_to_index: HashMap<String, NodeIndex>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the traversal graph from a registry and its recommendations.
    ///
    /// Edges come from each node's own adjacency list and from every
    /// recommendation's `from → to[i]` pairs. Edges referencing unknown IDs
    /// are skipped. Duplicate edges are deduplicated (first wins).
    pub fn build(registry: &Registry, recommendations: &[LinkRecommendation]) -> Self {
        let mut lg = Self {
            graph: DiGraph::with_capacity(registry.len(), registry.len() * 2),
            id_to_index: HashMap::with_capacity(registry.len()),
        };

        for node in registry.nodes() {
            lg.add_node(RouteNode {
                id: node.id.clone(),
                cluster: node.cluster.clone(),
                resonance_score: node.resonance_score,
            });
        }

        for node in registry.nodes() {
            for target in &node.links {
                lg.add_edge(&node.id, target, RouteEdge { weight: node.link_weight });
            }
        }
        for rec in recommendations {
            for target in &rec.to {
                lg.add_edge(&rec.from, target, RouteEdge::default());
            }
        }

        tracing::debug!(
            nodes = lg.node_count(),
            edges = lg.edge_count(),
            "link graph built"
        );
        lg
    }

    /// Add a node. Returns the existing index if the ID is already present.
    pub fn add_node(&mut self, node: RouteNode) -> NodeIndex {
        if let Some(&idx) = self.id_to_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_to_index.insert(id, idx);
        idx
    }

    /// Add an edge between two IDs. No-op when either ID is unknown or the
    /// edge already exists.
    pub fn add_edge(&mut self, from: &str, to: &str, edge: RouteEdge) {
        let (Some(&f), Some(&t)) = (self.id_to_index.get(from), self.id_to_index.get(to)) else {
            return;
        };
        if self.graph.find_edge(f, t).is_none() {
            self.graph.add_edge(f, t, edge);
        }
    }

    pub fn get_index(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    pub fn id_of(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].id
    }

    /// Outgoing neighbor indices of a node.
    pub fn outgoing(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    /// Incoming neighbor indices of a node.
    pub fn incoming(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Incoming)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::RecommendationStatus;
    use crate::registry::{Node, NodeKind};

    fn node(id: &str, links: &[&str]) -> Node {
        let mut n = Node::new(id, NodeKind::Tool, id, format!("/tools/{}", id));
        n.links = links.iter().map(|s| s.to_string()).collect();
        n
    }

    #[test]
    fn test_build_from_registry_links() {
        let registry = Registry::from_nodes(vec![
            node("a", &["b", "c"]),
            node("b", &["c"]),
            node("c", &[]),
        ]);
        let lg = LinkGraph::build(&registry, &[]);
        assert_eq!(lg.node_count(), 3);
        assert_eq!(lg.edge_count(), 3);

        let a = lg.get_index("a").unwrap();
        let out: Vec<&str> = lg.outgoing(a).map(|i| lg.id_of(i)).collect();
        assert_eq!(out.len(), 2);
        assert!(out.contains(&"b") && out.contains(&"c"));
    }

    #[test]
    fn test_build_merges_recommendations_and_dedups() {
        let registry = Registry::from_nodes(vec![node("a", &["b"]), node("b", &[])]);
        let recs = vec![LinkRecommendation {
            from: "a".into(),
            to: vec!["b".into()], // duplicate of the registry edge
            cluster: "c".into(),
            reason: "r".into(),
            status: RecommendationStatus::Draft,
        }];
        let lg = LinkGraph::build(&registry, &recs);
        assert_eq!(lg.edge_count(), 1);
    }

    #[test]
    fn test_unknown_edge_targets_skipped() {
        let registry = Registry::from_nodes(vec![node("a", &["ghost"])]);
        let lg = LinkGraph::build(&registry, &[]);
        assert_eq!(lg.node_count(), 1);
        assert_eq!(lg.edge_count(), 0);
    }

    #[test]
    fn test_incoming_neighbors() {
        let registry = Registry::from_nodes(vec![
            node("a", &["c"]),
            node("b", &["c"]),
            node("c", &[]),
        ]);
        let lg = LinkGraph::build(&registry, &[]);
        let c = lg.get_index("c").unwrap();
        let inc: Vec<&str> = lg.incoming(c).map(|i| lg.id_of(i)).collect();
        assert_eq!(inc.len(), 2);
    }
}
