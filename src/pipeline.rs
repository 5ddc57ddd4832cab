//! Build-stage orchestration: source collections → scored registry →
//! artifacts on disk.
//!
//! [`run_build`] is the library entry behind `resograph build`. A dry run
//! computes the full result and writes nothing; a limit caps the registry to
//! the first N loaded nodes for canary builds.

use chrono::{DateTime, Utc};

use crate::artifacts::{self, LinkMapArtifact, ProposalsArtifact, RegistryArtifact};
use crate::error::PipelineError;
use crate::links::recommend_links;
use crate::registry::{ContentGraphLoader, Registry};
use crate::scoring::{read_signals, ResonanceScorer};
use crate::PipelineConfig;

/// Flags controlling a build run.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Compute and report without writing any artifact.
    pub dry_run: bool,
    /// Cap the registry to the first N loaded nodes.
    pub limit: Option<usize>,
}

/// Outcome of a build run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Node count after the optional limit was applied.
    pub nodes: usize,
    pub signals_applied: usize,
    pub signals_dropped: usize,
    pub recommendations: usize,
    pub proposals: usize,
    /// False for dry runs.
    pub artifacts_written: bool,
}

/// Load sources, apply signals, recommend links, and write the registry,
/// link-map, and proposal artifacts (unless `dry_run`).
pub fn run_build(
    config: &PipelineConfig,
    options: &BuildOptions,
    now: DateTime<Utc>,
) -> Result<BuildReport, PipelineError> {
    let mut registry = ContentGraphLoader::new(config.sources.clone()).load();
    if let Some(limit) = options.limit {
        if registry.len() > limit {
            tracing::info!(limit, loaded = registry.len(), "capping registry for canary build");
            registry =
                Registry::from_nodes(registry.into_nodes().into_iter().take(limit).collect());
        }
    }
    tracing::info!("Loaded {} nodes from source collections", registry.len());

    let signals = read_signals(&config.signals_path);
    let scorer = ResonanceScorer::new(config.scoring.clone());
    let summary = scorer.run(&mut registry, &signals, now);

    let recommendations = recommend_links(&registry, &config.links);
    tracing::info!("Computed {} link recommendations", recommendations.len());

    let nodes = registry.into_nodes();
    let proposals = ProposalsArtifact::from_nodes(&nodes, config.proposal_threshold);
    let report = BuildReport {
        nodes: nodes.len(),
        signals_applied: summary.signals_applied,
        signals_dropped: summary.signals_dropped,
        recommendations: recommendations.len(),
        proposals: proposals.proposals.len(),
        artifacts_written: !options.dry_run,
    };

    if options.dry_run {
        tracing::info!(
            nodes = report.nodes,
            proposals = report.proposals,
            "dry run, no artifacts written"
        );
        return Ok(report);
    }

    std::fs::create_dir_all(&config.out_dir)?;
    artifacts::write_artifact(&proposals, &config.proposals_path())?;
    artifacts::write_artifact(&LinkMapArtifact::new(recommendations), &config.link_map_path())?;
    artifacts::write_artifact(&RegistryArtifact::new(nodes), &config.registry_path())?;
    tracing::info!("Artifacts written to {}", config.out_dir.display());
    Ok(report)
}
