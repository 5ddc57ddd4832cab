//! Content graph loader — raw collections → uniform node registry.
//!
//! Reads the four source collections (gates, pain points, tools, insights),
//! merges duplicate tool identities, and normalizes everything into a flat
//! [`Registry`].
//!
//! ## Degradation contract
//!
//! A missing or malformed source file degrades to an empty collection with a
//! warning — never a fatal error at this stage. Fatality for missing primary
//! inputs is a migration-engine concern, not a loader concern.
//!
//! ## Tool merge policy
//!
//! Tools can arrive from two sources. Duplicates (by normalized slug) are
//! merged keeping the more complete record: for each field, the first
//! non-empty value wins, with the primary source ordered first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::models::{normalize_slug, Node, NodeKind, Registry};
use super::sources::{GateSource, InsightSource, PainPointSource, ToolSource};

/// Source file locations for one build.
#[derive(Debug, Clone, Default)]
pub struct SourcePaths {
    pub gates: PathBuf,
    pub pain_points: PathBuf,
    pub tools: PathBuf,
    /// Secondary tool source merged into the primary by slug.
    pub tools_secondary: Option<PathBuf>,
    pub insights: PathBuf,
}

/// Loads and normalizes the content graph.
pub struct ContentGraphLoader {
    paths: SourcePaths,
}

impl ContentGraphLoader {
    pub fn new(paths: SourcePaths) -> Self {
        Self { paths }
    }

    /// Load every collection and build the node registry.
    ///
    /// Node order is deterministic: gates (file order), pain points (gate
    /// slug order, then file order within a gate), merged tools, insights.
    pub fn load(&self) -> Registry {
        let gates: Vec<GateSource> = read_collection(&self.paths.gates);
        let pain_points: BTreeMap<String, Vec<PainPointSource>> =
            read_collection_map(&self.paths.pain_points);
        let primary_tools: Vec<ToolSource> = read_collection(&self.paths.tools);
        let secondary_tools: Vec<ToolSource> = match &self.paths.tools_secondary {
            Some(path) => read_collection(path),
            None => Vec::new(),
        };
        let insights: Vec<InsightSource> = read_collection(&self.paths.insights);

        let tools = merge_tools(primary_tools, secondary_tools);

        let mut nodes = Vec::new();
        for gate in &gates {
            nodes.push(gate_node(gate));
        }
        for (gate_slug, points) in &pain_points {
            for point in points {
                nodes.push(pain_point_node(gate_slug, point));
            }
        }
        for tool in &tools {
            nodes.push(tool_node(tool));
        }
        for insight in &insights {
            nodes.push(insight_node(insight));
        }

        tracing::info!(
            gates = gates.len(),
            pain_points = pain_points.values().map(Vec::len).sum::<usize>(),
            tools = tools.len(),
            insights = insights.len(),
            "content graph loaded"
        );

        Registry::from_nodes(nodes)
    }
}

// ============================================================================
// Normalization per collection
// ============================================================================

fn gate_node(gate: &GateSource) -> Node {
    let slug = normalize_slug(&gate.slug);
    let path = gate
        .path
        .clone()
        .unwrap_or_else(|| format!("/gates/{}", slug));
    let mut node = Node::new(slug, NodeKind::Gate, gate.title.clone(), path);
    node.tags = gate.tags.clone();
    node
}

fn pain_point_node(gate_slug: &str, point: &PainPointSource) -> Node {
    let gate = normalize_slug(gate_slug);
    let slug = normalize_slug(&point.slug);
    let path = point
        .path
        .clone()
        .unwrap_or_else(|| format!("/gates/{}/{}", gate, slug));
    // Composite ID keeps the parent derivable without the cluster field.
    let mut node = Node::new(
        format!("{}::{}", gate, slug),
        NodeKind::PainPoint,
        point.title.clone(),
        path,
    );
    node.cluster = Some(gate);
    node.tags = point.tags.clone();
    node
}

fn tool_node(tool: &ToolSource) -> Node {
    let slug = normalize_slug(&tool.slug);
    let path = tool
        .path
        .clone()
        .unwrap_or_else(|| format!("/tools/{}", slug));
    let title = tool.title.clone().unwrap_or_else(|| slug.clone());
    let mut node = Node::new(format!("tools::{}", slug), NodeKind::Tool, title, path);
    node.cluster = Some(
        tool.category
            .as_deref()
            .map(normalize_slug)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "tools".to_string()),
    );
    node.tags = tool.tags.clone();
    node
}

fn insight_node(insight: &InsightSource) -> Node {
    let slug = normalize_slug(&insight.slug);
    let path = insight
        .path
        .clone()
        .unwrap_or_else(|| format!("/insights/{}", slug));
    let mut node = Node::new(
        format!("insights::{}", slug),
        NodeKind::Insight,
        insight.title.clone(),
        path,
    );
    node.cluster = Some(
        insight
            .gate
            .as_deref()
            .map(normalize_slug)
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| "insights".to_string()),
    );
    node.tags = insight.tags.clone();
    node
}

// ============================================================================
// Tool merge
// ============================================================================

/// Merge two tool collections by normalized slug.
///
/// Output order: primary source order, then secondary-only entries in their
/// own order. For duplicate slugs, each field takes the first non-empty value
/// (primary first).
pub fn merge_tools(primary: Vec<ToolSource>, secondary: Vec<ToolSource>) -> Vec<ToolSource> {
    let mut merged: Vec<ToolSource> = Vec::with_capacity(primary.len() + secondary.len());
    let mut position: BTreeMap<String, usize> = BTreeMap::new();

    for tool in primary.into_iter().chain(secondary) {
        let key = normalize_slug(&tool.slug);
        if key.is_empty() {
            tracing::warn!(slug = %tool.slug, "tool with empty normalized slug dropped");
            continue;
        }
        match position.get(&key) {
            Some(&idx) => fill_missing(&mut merged[idx], tool),
            None => {
                position.insert(key, merged.len());
                merged.push(tool);
            }
        }
    }
    merged
}

/// Copy non-empty fields from `incoming` into holes in `existing`.
fn fill_missing(existing: &mut ToolSource, incoming: ToolSource) {
    if existing.title.as_deref().map_or(true, str::is_empty) {
        if let Some(title) = incoming.title.filter(|t| !t.is_empty()) {
            existing.title = Some(title);
        }
    }
    if existing.path.as_deref().map_or(true, str::is_empty) {
        if let Some(path) = incoming.path.filter(|p| !p.is_empty()) {
            existing.path = Some(path);
        }
    }
    if existing.category.as_deref().map_or(true, str::is_empty) {
        if let Some(category) = incoming.category.filter(|c| !c.is_empty()) {
            existing.category = Some(category);
        }
    }
    if existing.vendor.as_deref().map_or(true, str::is_empty) {
        if let Some(vendor) = incoming.vendor.filter(|v| !v.is_empty()) {
            existing.vendor = Some(vendor);
        }
    }
    if existing.tags.is_empty() && !incoming.tags.is_empty() {
        existing.tags = incoming.tags;
    }
}

// ============================================================================
// File reading (degrade-to-empty)
// ============================================================================

fn read_collection<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "malformed collection, using empty");
                Vec::new()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable collection, using empty");
            Vec::new()
        }
    }
}

fn read_collection_map<T: DeserializeOwned>(path: &Path) -> BTreeMap<String, Vec<T>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "malformed keyed collection, using empty");
                BTreeMap::new()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable keyed collection, using empty");
            BTreeMap::new()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
