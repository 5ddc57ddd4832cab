//! Resonance Graph - Pipeline CLI
//!
//! Builds the scored registry, migrates it to the new schema, and heals
//! routes around failed nodes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resonance_graph::artifacts;
use resonance_graph::governor::{ResourceGovernor, SystemMonitor};
use resonance_graph::graph::{LinkGraph, RouteDiscovery};
use resonance_graph::migration::{
    AbortReason, FileHeartbeatSink, MigrationEngine, NullHeartbeatSink,
};
use resonance_graph::pipeline::{self, BuildOptions};
use resonance_graph::registry::Registry;
use resonance_graph::PipelineConfig;

#[derive(Parser)]
#[command(name = "resograph")]
#[command(about = "Resonance graph builder and migration pipeline")]
struct Cli {
    /// Path to the YAML config file (default: resograph.yaml)
    #[arg(short, long, env = "RESOGRAPH_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load sources, apply signals, and write the scored artifacts
    Build {
        /// Compute and report counts only; write nothing
        #[arg(long)]
        dry_run: bool,

        /// Canary cap: build from only the first N loaded nodes
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Migrate the scored registry to the new schema
    Migrate {
        /// Validate and count only; write nothing
        #[arg(long)]
        dry_run: bool,

        /// Canary cap: process only the first N nodes
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Recompute routes around failed nodes
    Heal {
        /// IDs of nodes to route around
        #[arg(required = true)]
        failed: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,resonance_graph=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_yaml_and_env(cli.config.as_deref().map(std::path::Path::new))?;

    match cli.command {
        Commands::Build { dry_run, limit } => run_build(config, dry_run, limit),
        Commands::Migrate { dry_run, limit } => run_migrate(config, dry_run, limit).await,
        Commands::Heal { failed } => run_heal(config, &failed),
    }
}

fn run_build(config: PipelineConfig, dry_run: bool, limit: Option<usize>) -> Result<()> {
    let options = BuildOptions { dry_run, limit };
    let report = pipeline::run_build(&config, &options, chrono::Utc::now())?;
    tracing::info!(
        nodes = report.nodes,
        signals_applied = report.signals_applied,
        recommendations = report.recommendations,
        proposals = report.proposals,
        artifacts_written = report.artifacts_written,
        "build finished"
    );
    Ok(())
}

async fn run_migrate(config: PipelineConfig, dry_run: bool, limit: Option<u64>) -> Result<()> {
    std::fs::create_dir_all(&config.out_dir)?;

    let registry = artifacts::load_registry(&config.registry_path())?;
    tracing::info!("Migrating {} nodes", registry.nodes.len());

    let governor = ResourceGovernor::new(
        Box::new(SystemMonitor::current_process()),
        config.governor.clone(),
    );
    let mut engine = MigrationEngine::new(config.migration.clone())
        .with_governor(governor)
        .with_anchors(config.anchors.clone())
        .dry_run(dry_run)
        .limit(limit);
    if dry_run {
        engine = engine.with_sink(Box::new(NullHeartbeatSink));
    } else {
        engine = engine.with_sink(Box::new(FileHeartbeatSink::open(&config.heartbeat_path())?));
    }

    // Ctrl-C requests a graceful stop at the next batch boundary.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping at next batch boundary");
            signal_token.cancel();
        }
    });

    let report = engine
        .run(
            &registry.nodes,
            &config.migrated_path(),
            &config.checkpoint_path(),
            &cancel,
        )
        .await?;

    match &report.abort_reason {
        None => tracing::info!(
            total_processed = report.total_processed,
            skipped = report.skipped,
            batches = report.batches,
            "migration completed"
        ),
        // A governor kill or interrupt is a clean stop: the checkpoint is
        // durable and the run resumes from it.
        Some(AbortReason::ResourceLimit(detail)) => {
            tracing::warn!(detail = %detail, "migration stopped by resource governor; re-run to resume")
        }
        Some(AbortReason::Cancelled) => {
            tracing::warn!("migration interrupted; re-run to resume")
        }
    }
    Ok(())
}

fn run_heal(config: PipelineConfig, failed: &[String]) -> Result<()> {
    let registry_artifact = artifacts::load_registry(&config.registry_path())?;
    let link_map = artifacts::load_link_map(&config.link_map_path())?;
    let recommendations = link_map.map(|a| a.recommendations).unwrap_or_default();

    let registry = Registry::from_nodes(registry_artifact.nodes);
    let graph = LinkGraph::build(&registry, &recommendations);
    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "link graph assembled"
    );

    let mut discovery = RouteDiscovery::new(graph, config.routes.clone(), config.anchors.clone());
    let report = discovery.heal(failed);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
