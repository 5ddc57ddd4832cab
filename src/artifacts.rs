//! Pipeline artifacts — versioned JSON envelopes on disk.
//!
//! Every artifact carries the same envelope (`version`, `generated`) so
//! downstream consumers can reject files produced by an incompatible build.
//! The build stage writes three artifacts:
//!
//! - `registry.json` — the full scored registry
//! - `link-map.json` — cluster link recommendations
//! - `node-proposals.json` — nodes whose resonance clears the proposal
//!   threshold, flagged for editorial promotion
//!
//! Writes go through temp + rename so a crash never leaves a half-written
//! artifact behind a valid filename.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PipelineError;
use crate::links::LinkRecommendation;
use crate::registry::Node;

/// Bumped on any breaking change to an artifact schema.
pub const ARTIFACT_VERSION: u32 = 1;

/// Default resonance threshold above which a node is proposed for promotion.
pub const DEFAULT_PROPOSAL_THRESHOLD: f64 = 2.5;

// ============================================================================
// Envelopes
// ============================================================================

/// `registry.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryArtifact {
    pub version: u32,
    pub generated: DateTime<Utc>,
    pub nodes: Vec<Node>,
}

/// `link-map.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMapArtifact {
    pub version: u32,
    pub generated: DateTime<Utc>,
    pub recommendations: Vec<LinkRecommendation>,
}

/// One promotion candidate in `node-proposals.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProposal {
    pub id: String,
    pub title: String,
    pub path: String,
    pub cluster: Option<String>,
    pub resonance_score: f64,
}

/// `node-proposals.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalsArtifact {
    pub version: u32,
    pub generated: DateTime<Utc>,
    /// Editorial review state for the whole batch; proposals start `draft`.
    pub status: String,
    pub threshold: f64,
    pub proposals: Vec<NodeProposal>,
}

// ============================================================================
// Builders
// ============================================================================

impl RegistryArtifact {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            generated: Utc::now(),
            nodes,
        }
    }
}

impl LinkMapArtifact {
    pub fn new(recommendations: Vec<LinkRecommendation>) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            generated: Utc::now(),
            recommendations,
        }
    }
}

impl ProposalsArtifact {
    /// Collect proposals from scored nodes at or above the threshold,
    /// preserving registry order.
    pub fn from_nodes(nodes: &[Node], threshold: f64) -> Self {
        let proposals = nodes
            .iter()
            .filter(|n| n.resonance_score >= threshold)
            .map(|n| NodeProposal {
                id: n.id.clone(),
                title: n.title.clone(),
                path: n.path.clone(),
                cluster: n.cluster.clone(),
                resonance_score: n.resonance_score,
            })
            .collect();
        Self {
            version: ARTIFACT_VERSION,
            generated: Utc::now(),
            status: "draft".to_string(),
            threshold,
            proposals,
        }
    }
}

// ============================================================================
// Disk I/O
// ============================================================================

/// Atomically write any serializable artifact as pretty JSON.
pub fn write_artifact<T: Serialize>(artifact: &T, path: &Path) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(artifact).map_err(|e| PipelineError::Malformed {
        path: path.display().to_string(),
        source: e,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact.json".to_string());
    let tmp = path.with_file_name(format!("{}.tmp", file_name));
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load `registry.json` as the primary input of the migrate and heal stages.
///
/// Unlike the source collections, a missing or unversioned registry here is
/// fatal — there is nothing sensible to migrate without it.
pub fn load_registry(path: &Path) -> Result<RegistryArtifact, PipelineError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::Corruption(format!(
                "registry artifact {} not found; run the build stage first",
                path.display()
            ))
        } else {
            e.into()
        }
    })?;
    let artifact: RegistryArtifact =
        serde_json::from_str(&contents).map_err(|e| PipelineError::Malformed {
            path: path.display().to_string(),
            source: e,
        })?;
    if artifact.version != ARTIFACT_VERSION {
        return Err(PipelineError::Corruption(format!(
            "registry artifact {} has version {}, this build expects {}",
            path.display(),
            artifact.version,
            ARTIFACT_VERSION
        )));
    }
    Ok(artifact)
}

/// Load `link-map.json`; absent is fine (the heal stage degrades to the
/// registry's embedded links alone).
pub fn load_link_map(path: &Path) -> Result<Option<LinkMapArtifact>, PipelineError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| PipelineError::Malformed {
            path: path.display().to_string(),
            source: e,
        })
}
