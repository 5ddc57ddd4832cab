//! Raw source collection schemas.
//!
//! Each input collection has an explicit deserialization target with
//! documented defaults — no duck-typed field fallbacks. Optional fields
//! default to empty/`None`; the loader owns the ordered resolution of
//! derived values (paths, clusters, composite IDs).

use serde::Deserialize;

/// A topical gate — the top-level grouping of the content graph.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateSource {
    pub slug: String,
    pub title: String,
    /// Canonical address. Default: `/gates/{slug}`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A pain point, keyed by its parent gate in the source file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PainPointSource {
    pub slug: String,
    pub title: String,
    /// Default: `/gates/{gate}/{slug}`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A tool entry. Tools may arrive from two sources and are merged by
/// normalized slug with first-non-empty-field-wins semantics.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSource {
    pub slug: String,
    /// Default after merge: the slug itself.
    #[serde(default)]
    pub title: Option<String>,
    /// Default: `/tools/{slug}`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Cluster for link recommendation. Default: `"tools"`.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
}

/// An insight article, optionally attached to a gate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSource {
    pub slug: String,
    pub title: String,
    /// Default: `/insights/{slug}`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Parent gate slug. Default cluster when absent: `"insights"`.
    #[serde(default)]
    pub gate: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_source_minimal() {
        let gate: GateSource = serde_json::from_str(r#"{"slug":"privacy","title":"Privacy"}"#).unwrap();
        assert_eq!(gate.slug, "privacy");
        assert!(gate.path.is_none());
        assert!(gate.tags.is_empty());
    }

    #[test]
    fn test_tool_source_optional_fields() {
        let tool: ToolSource = serde_json::from_str(
            r#"{"slug":"wireguard","category":"vpn","tags":["network"]}"#,
        )
        .unwrap();
        assert!(tool.title.is_none());
        assert_eq!(tool.category.as_deref(), Some("vpn"));
        assert_eq!(tool.tags, vec!["network"]);
    }

    #[test]
    fn test_insight_source_gate_binding() {
        let insight: InsightSource = serde_json::from_str(
            r#"{"slug":"dns-leaks","title":"DNS Leaks","gate":"privacy"}"#,
        )
        .unwrap();
        assert_eq!(insight.gate.as_deref(), Some("privacy"));
    }
}
