//! Node registry data models.
//!
//! Defines the uniform node type every content collection normalizes into:
//!
//! - [`NodeKind`] — which source collection a node came from
//! - [`Node`] — a content unit with resonance/decay scores and adjacency
//! - [`Registry`] — the full node set with ID and path indexes
//! - [`AnchorSet`] — gold-standard node IDs pinned against eviction
//!
//! Scores are mutated only by the resonance scorer; the migration engine
//! reads nodes and writes a separate transformed schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Default resonance score for a freshly built node (also the absolute floor).
pub const DEFAULT_RESONANCE: f64 = 0.5;

/// Source collection a node was normalized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Gate,
    PainPoint,
    Tool,
    Insight,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gate => write!(f, "gate"),
            Self::PainPoint => write!(f, "painPoint"),
            Self::Tool => write!(f, "tool"),
            Self::Insight => write!(f, "insight"),
        }
    }
}

/// A content unit in the resonance graph.
///
/// Created once per build by the loader. `resonance_score` never drops below
/// [`DEFAULT_RESONANCE`]; `decay_score` stays within `[0.0, 0.5]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Globally unique identifier. Composite IDs use `"parent::child"` form.
    pub id: String,
    /// Source collection this node came from.
    pub kind: NodeKind,
    /// Cluster used for link recommendation grouping. `None` = ungrouped.
    #[serde(default)]
    pub cluster: Option<String>,
    /// Display title.
    pub title: String,
    /// Canonical address of the content unit.
    pub path: String,
    /// Topical tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Relevance weight, raised by signals and lowered by decay. Floor 0.5.
    #[serde(default = "default_resonance")]
    pub resonance_score: f64,
    /// Accumulated staleness penalty, clamped to [0, 0.5].
    #[serde(default)]
    pub decay_score: f64,
    /// Edge weight applied to this node's outbound links.
    #[serde(default = "default_link_weight")]
    pub link_weight: f64,
    /// Outbound adjacency (node IDs). Validated by the migration engine.
    #[serde(default)]
    pub links: Vec<String>,
    /// Timestamp of the most recent signal applied to this node.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

fn default_resonance() -> f64 {
    DEFAULT_RESONANCE
}

fn default_link_weight() -> f64 {
    1.0
}

impl Node {
    /// Create a node with default scores and no adjacency.
    pub fn new(id: impl Into<String>, kind: NodeKind, title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            cluster: None,
            title: title.into(),
            path: path.into(),
            tags: Vec::new(),
            resonance_score: DEFAULT_RESONANCE,
            decay_score: 0.0,
            link_weight: 1.0,
            links: Vec::new(),
            last_updated: None,
        }
    }
}

// ============================================================================
// Slug / path normalization
// ============================================================================

/// Normalize a free-form identity into a slug: lowercase, runs of
/// non-alphanumeric characters collapsed to a single `-`, no leading or
/// trailing separators.
pub fn normalize_slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Normalize a content path for signal resolution: lowercase, trimmed,
/// leading `/` enforced, trailing `/` stripped.
pub fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().to_ascii_lowercase();
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// The full node set built from content sources, with ID and normalized-path
/// indexes for O(1) signal resolution.
///
/// Nodes are stored in insertion order; that order is what stable sorts and
/// the migration engine's input ordering are defined against.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    nodes: Vec<Node>,
    id_index: HashMap<String, usize>,
    path_index: HashMap<String, usize>,
}

impl Registry {
    /// Build a registry from a node list. Later duplicates of an ID are
    /// dropped with a warning (IDs are globally unique by contract).
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut registry = Self::default();
        for node in nodes {
            registry.insert(node);
        }
        registry
    }

    /// Insert a node, indexing it by ID and normalized path.
    /// Returns false (and drops the node) if the ID is already present.
    pub fn insert(&mut self, node: Node) -> bool {
        if self.id_index.contains_key(&node.id) {
            tracing::warn!("duplicate node id {:?} dropped from registry", node.id);
            return false;
        }
        let idx = self.nodes.len();
        self.id_index.insert(node.id.clone(), idx);
        self.path_index.insert(normalize_path(&node.path), idx);
        self.nodes.push(node);
        true
    }

    /// Look up a node by ID.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.id_index.get(id).map(|&i| &self.nodes[i])
    }

    /// Resolve a signal target: ID first, then normalized path.
    /// Returns the node's position in insertion order.
    pub fn resolve(&self, node_id: Option<&str>, path: Option<&str>) -> Option<usize> {
        if let Some(id) = node_id {
            if let Some(&idx) = self.id_index.get(id) {
                return Some(idx);
            }
        }
        if let Some(p) = path {
            if let Some(&idx) = self.path_index.get(&normalize_path(p)) {
                return Some(idx);
            }
        }
        None
    }

    /// Mutable access by insertion position (used by the scorer).
    pub fn node_mut(&mut self, idx: usize) -> &mut Node {
        &mut self.nodes[idx]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ============================================================================
// Gold-standard anchors
// ============================================================================

/// A named set of node IDs that must never be evicted from in-memory working
/// sets during a run. A pinning invariant, not a scoring rule.
#[derive(Debug, Clone, Default)]
pub struct AnchorSet {
    name: String,
    ids: HashSet<String>,
}

impl AnchorSet {
    pub fn new(name: impl Into<String>, ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            ids: ids.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
