//! Per-node validation and schema transform.
//!
//! Validation distinguishes two failure severities:
//! - an empty ID is a per-node defect → skip, log, continue
//! - a self-referential adjacency list is structural corruption → the whole
//!   run aborts with the last checkpoint intact
//!
//! The transform derives `parent_id` from the cluster when present, falling
//! back to the `"a::b"` composite-ID convention, and computes a bounded risk
//! weight from the resonance/decay pair.

use serde::{Deserialize, Serialize};

use crate::registry::Node;

/// Output schema of the migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigratedNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub path: String,
    pub tags: Vec<String>,
    /// `round(clamp(resonance * (1 - decay), 0, 1), 2)`
    pub risk_weight: f64,
    pub link_weight: f64,
}

/// Validation outcome for a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIssue {
    /// Skippable: the node has no usable identity.
    EmptyId,
    /// Corruption: the node's adjacency list references itself.
    SelfReference,
}

/// Validate one node ahead of transformation.
pub fn validate(node: &Node) -> Result<(), NodeIssue> {
    if node.id.trim().is_empty() {
        return Err(NodeIssue::EmptyId);
    }
    if node.links.iter().any(|target| target == &node.id) {
        return Err(NodeIssue::SelfReference);
    }
    Ok(())
}

/// Parent derivation: explicit cluster first, then the `"a::b"` composite-ID
/// prefix, otherwise none.
pub fn derive_parent_id(node: &Node) -> Option<String> {
    if let Some(cluster) = node.cluster.as_deref().filter(|c| !c.is_empty()) {
        return Some(cluster.to_string());
    }
    match node.id.split_once("::") {
        Some((prefix, rest)) if !prefix.is_empty() && !rest.is_empty() => {
            Some(prefix.to_string())
        }
        _ => None,
    }
}

/// Bounded risk weight, rounded to two decimals.
pub fn risk_weight(resonance_score: f64, decay_score: f64) -> f64 {
    let raw = (resonance_score * (1.0 - decay_score)).clamp(0.0, 1.0);
    (raw * 100.0).round() / 100.0
}

/// Transform a validated node into the output schema.
pub fn transform(node: &Node) -> MigratedNode {
    MigratedNode {
        id: node.id.clone(),
        parent_id: derive_parent_id(node),
        title: node.title.clone(),
        path: node.path.clone(),
        tags: node.tags.clone(),
        risk_weight: risk_weight(node.resonance_score, node.decay_score),
        link_weight: node.link_weight,
    }
}
