//! Link recommendation engine.
//!
//! Groups nodes by cluster, picks each cluster's top-K nodes by resonance
//! (the "hub" set, stable sort — ties keep registry insertion order), and
//! recommends the hubs as outbound links for every non-hub cluster member.
//!
//! Invariants:
//! - a node is never recommended to itself (`from ∉ to`)
//! - hub nodes receive no recommendation rows
//! - hub set size ≤ K and ≤ cluster size
//!
//! Ungrouped nodes (`cluster == None`) receive no recommendations.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::registry::Registry;

/// Review state of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Draft,
    Approved,
}

/// A proposed set of outbound links from one node to its cluster's hubs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecommendation {
    pub from: String,
    /// Hub node IDs, ordered by descending resonance.
    pub to: Vec<String>,
    pub cluster: String,
    pub reason: String,
    pub status: RecommendationStatus,
}

/// Tuning for the recommendation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Hubs promoted per cluster (default 5).
    pub top_k: usize,
    /// Reason string attached to every generated recommendation.
    pub reason: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            reason: "promote high-resonance nodes within cluster".to_string(),
        }
    }
}

/// Generate draft recommendations for every cluster in the registry.
///
/// Clusters are emitted in first-appearance order; members within a cluster
/// keep registry insertion order, so output is deterministic for a given
/// registry.
pub fn recommend_links(registry: &Registry, config: &LinkConfig) -> Vec<LinkRecommendation> {
    // Group node positions by cluster, preserving first-appearance order.
    let mut cluster_order: Vec<String> = Vec::new();
    let mut clusters: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, node) in registry.nodes().iter().enumerate() {
        let Some(cluster) = &node.cluster else { continue };
        clusters
            .entry(cluster.clone())
            .or_insert_with(|| {
                cluster_order.push(cluster.clone());
                Vec::new()
            })
            .push(idx);
    }

    let mut recommendations = Vec::new();
    for cluster in &cluster_order {
        let members = &clusters[cluster];

        // Stable sort by resonance descending; ties keep insertion order.
        let mut ranked: Vec<usize> = members.clone();
        ranked.sort_by(|&a, &b| {
            let sa = registry.nodes()[a].resonance_score;
            let sb = registry.nodes()[b].resonance_score;
            sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
        });

        let hub_count = config.top_k.min(ranked.len());
        let hubs: Vec<String> = ranked[..hub_count]
            .iter()
            .map(|&i| registry.nodes()[i].id.clone())
            .collect();

        for &idx in members {
            let node = &registry.nodes()[idx];
            if hubs.contains(&node.id) {
                continue; // hubs receive no self-recommendation
            }
            recommendations.push(LinkRecommendation {
                from: node.id.clone(),
                to: hubs.clone(),
                cluster: cluster.clone(),
                reason: config.reason.clone(),
                status: RecommendationStatus::Draft,
            });
        }
    }

    tracing::info!(
        clusters = cluster_order.len(),
        recommendations = recommendations.len(),
        "link recommendation complete"
    );
    recommendations
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Node, NodeKind};

    fn node(id: &str, cluster: Option<&str>, score: f64) -> Node {
        let mut n = Node::new(id, NodeKind::Tool, id, format!("/tools/{}", id));
        n.cluster = cluster.map(Into::into);
        n.resonance_score = score;
        n
    }

    #[test]
    fn test_top_k_hubs_and_non_hub_targets() {
        let registry = Registry::from_nodes(vec![
            node("a", Some("vpn"), 3.0),
            node("b", Some("vpn"), 2.5),
            node("c", Some("vpn"), 2.0),
            node("d", Some("vpn"), 1.5),
            node("e", Some("vpn"), 1.0),
            node("f", Some("vpn"), 0.9),
            node("g", Some("vpn"), 0.8),
        ]);

        let recs = recommend_links(&registry, &LinkConfig::default());
        // 7 members, 5 hubs → 2 recommendations (f, g)
        assert_eq!(recs.len(), 2);
        for rec in &recs {
            assert_eq!(rec.to, vec!["a", "b", "c", "d", "e"]);
            assert_eq!(rec.cluster, "vpn");
            assert_eq!(rec.status, RecommendationStatus::Draft);
            assert!(!rec.to.contains(&rec.from), "self-target in {:?}", rec);
        }
        assert_eq!(recs[0].from, "f");
        assert_eq!(recs[1].from, "g");
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let registry = Registry::from_nodes(vec![
            node("first", Some("c"), 1.0),
            node("second", Some("c"), 1.0),
            node("third", Some("c"), 1.0),
        ]);
        let config = LinkConfig {
            top_k: 2,
            ..LinkConfig::default()
        };
        let recs = recommend_links(&registry, &config);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].from, "third");
        assert_eq!(recs[0].to, vec!["first", "second"]);
    }

    #[test]
    fn test_small_cluster_everyone_is_hub() {
        let registry = Registry::from_nodes(vec![
            node("a", Some("tiny"), 1.0),
            node("b", Some("tiny"), 2.0),
        ]);
        let recs = recommend_links(&registry, &LinkConfig::default());
        // Both members are hubs → no recommendations at all
        assert!(recs.is_empty());
    }

    #[test]
    fn test_ungrouped_nodes_skipped() {
        let registry = Registry::from_nodes(vec![
            node("solo", None, 9.0),
            node("a", Some("c"), 1.0),
        ]);
        let recs = recommend_links(&registry, &LinkConfig::default());
        assert!(recs.is_empty());
        // "solo" never appears anywhere
    }

    #[test]
    fn test_clusters_are_independent() {
        let mut nodes = Vec::new();
        for i in 0..6 {
            nodes.push(node(&format!("v{}", i), Some("vpn"), (6 - i) as f64));
        }
        for i in 0..6 {
            nodes.push(node(&format!("m{}", i), Some("mail"), (6 - i) as f64));
        }
        let registry = Registry::from_nodes(nodes);
        let recs = recommend_links(&registry, &LinkConfig::default());

        assert_eq!(recs.len(), 2); // one non-hub per cluster
        let vpn = recs.iter().find(|r| r.cluster == "vpn").unwrap();
        let mail = recs.iter().find(|r| r.cluster == "mail").unwrap();
        assert!(vpn.to.iter().all(|id| id.starts_with('v')));
        assert!(mail.to.iter().all(|id| id.starts_with('m')));
    }

    #[test]
    fn test_hub_set_bounded_by_cluster_size() {
        let registry = Registry::from_nodes(vec![node("a", Some("c"), 1.0)]);
        let recs = recommend_links(&registry, &LinkConfig::default());
        assert!(recs.is_empty());
    }
}
