//! Resonance Graph
//!
//! A content-graph pipeline with:
//! - a registry loader merging four source collections into one node graph
//! - signal-driven resonance scoring with idle and age decay
//! - cluster hub link recommendation
//! - a bounded-memory streaming migration engine with checkpoint/resume
//! - BFS route discovery and self-healing around failed nodes
//! - a resource governor enforcing memory ceilings at batch boundaries

pub mod artifacts;
pub mod error;
pub mod governor;
pub mod graph;
pub mod links;
pub mod migration;
pub mod pipeline;
pub mod registry;
pub mod scoring;

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use governor::GovernorConfig;
use graph::RouteDiscoveryConfig;
use links::LinkConfig;
use migration::MigrationConfig;
use registry::{AnchorSet, SourcePaths};
use scoring::ScoringConfig;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub paths: PathsYamlConfig,
    pub scoring: ScoringConfig,
    pub links: LinkConfig,
    pub migration: MigrationConfig,
    pub governor: GovernorConfig,
    pub routes: RouteDiscoveryConfig,
    pub proposals: ProposalsYamlConfig,
    /// Anchors section — if absent, no node is pinned
    pub anchors: Option<AnchorsYamlConfig>,
}

/// Source collection and output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsYamlConfig {
    pub gates: String,
    pub pain_points: String,
    pub tools: String,
    pub tools_secondary: Option<String>,
    pub insights: String,
    pub signals: String,
    pub out_dir: String,
}

impl Default for PathsYamlConfig {
    fn default() -> Self {
        Self {
            gates: "data/gates.json".into(),
            pain_points: "data/pain-points.json".into(),
            tools: "data/tools.json".into(),
            tools_secondary: None,
            insights: "data/insights.json".into(),
            signals: "data/signals.json".into(),
            out_dir: "out".into(),
        }
    }
}

/// Promotion proposal section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProposalsYamlConfig {
    pub threshold: f64,
}

impl Default for ProposalsYamlConfig {
    fn default() -> Self {
        Self {
            threshold: artifacts::DEFAULT_PROPOSAL_THRESHOLD,
        }
    }
}

/// Gold-standard anchor section
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AnchorsYamlConfig {
    pub name: String,
    pub ids: Vec<String>,
}

// ============================================================================
// Runtime config (what the pipeline actually uses)
// ============================================================================

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sources: SourcePaths,
    pub signals_path: PathBuf,
    pub out_dir: PathBuf,
    pub scoring: ScoringConfig,
    pub links: LinkConfig,
    pub migration: MigrationConfig,
    pub governor: GovernorConfig,
    pub routes: RouteDiscoveryConfig,
    pub proposal_threshold: f64,
    pub anchors: AnchorSet,
}

impl PipelineConfig {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "resograph.yaml" in CWD. If the file
    /// doesn't exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let mut migration = yaml.migration;
        if let Some(v) = env_parse("RESOGRAPH_BATCH_SIZE") {
            migration.batch_size = v;
        }
        if let Some(v) = env_parse("RESOGRAPH_HEARTBEAT_INTERVAL") {
            migration.heartbeat_interval = v;
        }
        if let Some(v) = env_parse("RESOGRAPH_CHECKPOINT_INTERVAL") {
            migration.checkpoint_interval = v;
        }

        let mut governor = yaml.governor;
        if let Some(v) = env_parse("RESOGRAPH_THROTTLE_BYTES") {
            governor.throttle_bytes = v;
        }
        if let Some(v) = env_parse("RESOGRAPH_HARD_KILL_BYTES") {
            governor.hard_kill_bytes = v;
        }

        let proposal_threshold =
            env_parse("RESOGRAPH_PROPOSAL_THRESHOLD").unwrap_or(yaml.proposals.threshold);

        let out_dir = std::env::var("RESOGRAPH_OUT_DIR").unwrap_or(yaml.paths.out_dir);

        Ok(Self {
            sources: SourcePaths {
                gates: PathBuf::from(&yaml.paths.gates),
                pain_points: PathBuf::from(&yaml.paths.pain_points),
                tools: PathBuf::from(&yaml.paths.tools),
                tools_secondary: yaml.paths.tools_secondary.map(PathBuf::from),
                insights: PathBuf::from(&yaml.paths.insights),
            },
            signals_path: PathBuf::from(&yaml.paths.signals),
            out_dir: PathBuf::from(out_dir),
            scoring: yaml.scoring,
            links: yaml.links,
            migration,
            governor,
            routes: yaml.routes,
            proposal_threshold,
            anchors: yaml
                .anchors
                .map(|a| AnchorSet::new(a.name, a.ids))
                .unwrap_or_default(),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("resograph.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.out_dir.join("registry.json")
    }

    pub fn link_map_path(&self) -> PathBuf {
        self.out_dir.join("link-map.json")
    }

    pub fn proposals_path(&self) -> PathBuf {
        self.out_dir.join("node-proposals.json")
    }

    pub fn migrated_path(&self) -> PathBuf {
        self.out_dir.join("migrated.ndjson")
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.out_dir.join("migration-checkpoint.json")
    }

    pub fn heartbeat_path(&self) -> PathBuf {
        self.out_dir.join("heartbeat.ndjson")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
paths:
  gates: fixtures/gates.json
  out_dir: /tmp/resograph-out

scoring:
  floor: 0.6

migration:
  batch_size: 250
  checkpoint_interval: 2000

governor:
  hard_kill_bytes: 2147483648

proposals:
  threshold: 3.0

anchors:
  name: gold
  ids:
    - privacy
    - tools::vpn
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.paths.gates, "fixtures/gates.json");
        assert_eq!(config.paths.out_dir, "/tmp/resograph-out");
        // Unspecified paths keep their defaults
        assert_eq!(config.paths.tools, "data/tools.json");
        assert!((config.scoring.floor - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.migration.batch_size, 250);
        assert_eq!(config.migration.checkpoint_interval, 2000);
        assert_eq!(config.governor.hard_kill_bytes, 2_147_483_648);
        assert!((config.proposals.threshold - 3.0).abs() < f64::EPSILON);

        let anchors = config.anchors.unwrap();
        assert_eq!(anchors.name, "gold");
        assert_eq!(anchors.ids.len(), 2);
    }

    #[test]
    fn test_yaml_defaults() {
        let config = YamlConfig::default();
        assert_eq!(config.migration.batch_size, 500);
        assert_eq!(config.migration.heartbeat_interval, 1000);
        assert_eq!(config.migration.checkpoint_interval, 5000);
        assert_eq!(config.governor.throttle_bytes, 512 * 1024 * 1024);
        assert!((config.proposals.threshold - 2.5).abs() < f64::EPSILON);
        assert!(config.anchors.is_none());
    }

    /// Combined test for YAML file loading and env var overrides.
    /// Runs as a single test to avoid parallel env var race conditions.
    #[test]
    fn test_yaml_and_env_lifecycle() {
        fn clear_env() {
            for var in &[
                "RESOGRAPH_BATCH_SIZE",
                "RESOGRAPH_HEARTBEAT_INTERVAL",
                "RESOGRAPH_CHECKPOINT_INTERVAL",
                "RESOGRAPH_THROTTLE_BYTES",
                "RESOGRAPH_HARD_KILL_BYTES",
                "RESOGRAPH_PROPOSAL_THRESHOLD",
                "RESOGRAPH_OUT_DIR",
            ] {
                std::env::remove_var(var);
            }
        }

        // --- Phase 1: YAML values loaded correctly ---
        let yaml = r#"
migration:
  batch_size: 100
governor:
  throttle_bytes: 1000000
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("resograph.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        let config = PipelineConfig::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.migration.batch_size, 100);
        assert_eq!(config.governor.throttle_bytes, 1_000_000);
        assert!(config.anchors.is_empty());

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("RESOGRAPH_BATCH_SIZE", "42");
        std::env::set_var("RESOGRAPH_OUT_DIR", "/tmp/env-out");

        let config = PipelineConfig::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.migration.batch_size, 42);
        assert_eq!(config.out_dir, PathBuf::from("/tmp/env-out"));
        // YAML value still used where no env override
        assert_eq!(config.governor.throttle_bytes, 1_000_000);

        clear_env();

        // --- Phase 3: No YAML file → defaults ---
        let nonexistent = Path::new("/tmp/nonexistent-resograph-12345.yaml");
        let config = PipelineConfig::from_yaml_and_env(Some(nonexistent)).unwrap();
        assert_eq!(config.migration.batch_size, 500);
        assert_eq!(config.registry_path(), PathBuf::from("out/registry.json"));
    }
}
