//! Streaming migration engine.
//!
//! Iterates a node collection in fixed-size batches without holding the
//! transformed output for the whole collection in memory:
//!
//! ```text
//! Idle → Loading → Processing → Checkpointing → Processing … → Completed
//!                      │                                          │
//!                      └──────────────── Aborted ◄────────────────┘
//! ```
//!
//! ## Contracts
//!
//! - Output index order equals input index order; no reordering across
//!   batches.
//! - Cancellation and governor verdicts are observed at batch boundaries
//!   only — never mid-batch. With batch size ≤ heartbeat interval, a
//!   hard-kill costs at most one heartbeat interval of extra work.
//! - Checkpoints pair with an output flush: flush the in-memory batch, then
//!   atomically replace the checkpoint. On resume, the output file is first
//!   truncated to the checkpointed line count, so a resumed run's output is
//!   byte-identical to an uninterrupted one.
//! - Per-node validation failures skip and log; structural corruption and
//!   resource hard-kills abort with the last checkpoint intact.
//!
//! ## Observing progress
//!
//! The [`HeartbeatSink`] passed via `with_sink` is the caller-facing
//! progress channel: every heartbeat interval the engine emits a record with
//! the current index, elapsed time, throughput, memory, and last successful
//! node ID, plus a record for every skip, the abort reason, and the final
//! summary. Attach an in-memory sink to watch a run programmatically, or the
//! file sink for an on-disk NDJSON trail; records arrive during the run, not
//! after it.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::governor::{GovernorVerdict, ResourceGovernor};
use crate::registry::{AnchorSet, Node};

use super::checkpoint::MigrationCheckpoint;
use super::heartbeat::{HeartbeatRecord, HeartbeatSink, NullHeartbeatSink};
use super::transform::{self, MigratedNode, NodeIssue};

// ============================================================================
// Configuration & outcome types
// ============================================================================

/// Batch and cadence tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Nodes per batch (default 500).
    pub batch_size: usize,
    /// Heartbeat every N consumed input indices (default 1,000).
    pub heartbeat_interval: u64,
    /// Checkpoint + flush every M consumed input indices (default 5,000).
    pub checkpoint_interval: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            heartbeat_interval: 1_000,
            checkpoint_interval: 5_000,
        }
    }
}

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Idle,
    Loading,
    Processing,
    Checkpointing,
    Completed,
    Aborted,
}

/// Why a run stopped short of completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    ResourceLimit(String),
    Cancelled,
}

/// Final accounting for one engine run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub completed: bool,
    pub abort_reason: Option<AbortReason>,
    /// Input size after `--limit` capping.
    pub total_input: u64,
    /// Successfully transformed nodes, cumulative across resumptions.
    pub total_processed: u64,
    /// Nodes skipped by validation in this run.
    pub skipped: u64,
    /// Batches executed in this run.
    pub batches: u64,
    /// Interval checkpoints written in this run (the completion checkpoint
    /// is not counted here).
    pub checkpoints_written: u64,
    /// Input index this run resumed from, when a checkpoint existed.
    pub resumed_from: Option<u64>,
}

// ============================================================================
// Engine
// ============================================================================

/// Single-worker streaming migration over a node collection.
///
/// All mutable run state lives on the instance; construct one per run.
pub struct MigrationEngine {
    config: MigrationConfig,
    governor: Option<ResourceGovernor>,
    sink: Box<dyn HeartbeatSink>,
    anchors: AnchorSet,
    /// Gold-standard nodes retained in memory for the whole run, exempt from
    /// batch clearing.
    pinned: HashMap<String, MigratedNode>,
    state: MigrationState,
    run_id: Uuid,
    dry_run: bool,
    limit: Option<u64>,
}

impl MigrationEngine {
    pub fn new(config: MigrationConfig) -> Self {
        Self {
            config,
            governor: None,
            sink: Box::new(NullHeartbeatSink),
            anchors: AnchorSet::default(),
            pinned: HashMap::new(),
            state: MigrationState::Idle,
            run_id: Uuid::new_v4(),
            dry_run: false,
            limit: None,
        }
    }

    /// Enforce memory ceilings at batch boundaries.
    pub fn with_governor(mut self, governor: ResourceGovernor) -> Self {
        self.governor = Some(governor);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn HeartbeatSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_anchors(mut self, anchors: AnchorSet) -> Self {
        self.anchors = anchors;
        self
    }

    /// Validate and count only; write no output, checkpoint, or truncation.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Canary cap: process only the first N input nodes.
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Anchored nodes retained across batch clears.
    pub fn pinned(&self) -> &HashMap<String, MigratedNode> {
        &self.pinned
    }

    /// Run the migration over `input`, writing NDJSON output and checkpoints.
    ///
    /// Returns `Ok` with an aborted report for graceful stops (hard-kill,
    /// cancellation); returns `Err` for corruption and fatal I/O.
    pub async fn run(
        &mut self,
        input: &[Node],
        output_path: &Path,
        checkpoint_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport, PipelineError> {
        self.state = MigrationState::Loading;
        let run_start = Instant::now();

        let capped: &[Node] = match self.limit {
            Some(limit) => &input[..input.len().min(limit as usize)],
            None => input,
        };
        let total_input = capped.len() as u64;

        let existing = MigrationCheckpoint::load(checkpoint_path)?;
        let resumed_from = existing.as_ref().map(|cp| cp.last_processed_index);
        let (start_index, mut total_processed, mut checkpoint_count, mut last_ok) = match &existing
        {
            Some(cp) => (
                cp.last_processed_index,
                cp.total_processed,
                cp.checkpoint_count,
                cp.last_successful_node_id.clone(),
            ),
            None => (0, 0, 0, None),
        };
        if start_index > total_input {
            self.state = MigrationState::Aborted;
            return Err(PipelineError::Corruption(format!(
                "checkpoint index {} exceeds input size {}",
                start_index, total_input
            )));
        }

        if !self.dry_run {
            if existing.is_some() {
                truncate_output(output_path, total_processed)?;
            } else {
                // Fresh run owns the output file.
                std::fs::File::create(output_path)?;
            }
        }
        if let Some(from) = resumed_from {
            tracing::info!(
                resumed_from = from,
                total_input,
                "resuming migration from checkpoint"
            );
        }

        let mut index = start_index;
        let mut since_checkpoint: u64 = 0;
        let mut out_batch: Vec<String> = Vec::new();
        let mut skipped: u64 = 0;
        let mut batches: u64 = 0;
        let mut checkpoints_written: u64 = 0;

        for chunk in capped[start_index as usize..].chunks(self.config.batch_size.max(1)) {
            // Batch boundary: the only place cancellation and resource
            // verdicts take effect.
            if cancel.is_cancelled() {
                return self.abort(
                    AbortReason::Cancelled,
                    index,
                    total_input,
                    total_processed,
                    skipped,
                    batches,
                    checkpoints_written,
                    resumed_from,
                );
            }
            if let Some(governor) = self.governor.as_mut() {
                match governor.check() {
                    GovernorVerdict::Proceed => {}
                    GovernorVerdict::Throttle(delay) => tokio::time::sleep(delay).await,
                    GovernorVerdict::HardKill { memory_bytes } => {
                        return self.abort(
                            AbortReason::ResourceLimit(format!(
                                "memory {} bytes over hard-kill ceiling",
                                memory_bytes
                            )),
                            index,
                            total_input,
                            total_processed,
                            skipped,
                            batches,
                            checkpoints_written,
                            resumed_from,
                        );
                    }
                }
            }

            self.state = MigrationState::Processing;
            for node in chunk {
                match transform::validate(node) {
                    Ok(()) => {
                        let migrated = transform::transform(node);
                        if self.anchors.contains(&migrated.id) {
                            self.pinned.insert(migrated.id.clone(), migrated.clone());
                        }
                        let line = serde_json::to_string(&migrated).map_err(|e| {
                            PipelineError::Malformed {
                                path: output_path.display().to_string(),
                                source: e,
                            }
                        })?;
                        out_batch.push(line);
                        last_ok = Some(migrated.id);
                        total_processed += 1;
                    }
                    Err(NodeIssue::EmptyId) => {
                        skipped += 1;
                        tracing::warn!(index, "node skipped: empty id");
                        let _ = self.sink.emit(&HeartbeatRecord::Skip {
                            run_id: self.run_id,
                            index,
                            node_id: node.id.clone(),
                            reason: "empty id".into(),
                            timestamp: Utc::now(),
                        });
                    }
                    Err(NodeIssue::SelfReference) => {
                        self.state = MigrationState::Aborted;
                        let reason =
                            format!("node {:?} references itself in its adjacency list", node.id);
                        let _ = self.sink.emit(&HeartbeatRecord::Abort {
                            run_id: self.run_id,
                            index,
                            reason: reason.clone(),
                            timestamp: Utc::now(),
                        });
                        return Err(PipelineError::Corruption(reason));
                    }
                }

                index += 1;
                if self.config.heartbeat_interval > 0 && index % self.config.heartbeat_interval == 0
                {
                    self.emit_progress(index, total_processed, start_index, run_start, &last_ok);
                }
            }

            batches += 1;
            since_checkpoint += chunk.len() as u64;
            if since_checkpoint >= self.config.checkpoint_interval {
                self.state = MigrationState::Checkpointing;
                if !self.dry_run {
                    flush_output(output_path, &mut out_batch)?;
                    checkpoint_count += 1;
                    MigrationCheckpoint {
                        last_processed_index: index,
                        total_processed,
                        last_checkpoint_timestamp: Utc::now(),
                        last_successful_node_id: last_ok.clone(),
                        checkpoint_count,
                    }
                    .write_atomic(checkpoint_path)?;
                } else {
                    out_batch.clear();
                }
                checkpoints_written += 1;
                since_checkpoint = 0;
            }

            // Cooperative yield between batches; this is where callers see
            // progress and cancellation gets a chance to land.
            tokio::task::yield_now().await;
        }

        if !self.dry_run {
            flush_output(output_path, &mut out_batch)?;
            checkpoint_count += 1;
            MigrationCheckpoint {
                last_processed_index: index,
                total_processed,
                last_checkpoint_timestamp: Utc::now(),
                last_successful_node_id: last_ok.clone(),
                checkpoint_count,
            }
            .write_atomic(checkpoint_path)?;
        }

        self.state = MigrationState::Completed;
        let _ = self.sink.emit(&HeartbeatRecord::Summary {
            run_id: self.run_id,
            total_input,
            total_processed,
            skipped,
            completed: true,
            timestamp: Utc::now(),
        });
        tracing::info!(
            total_input,
            total_processed,
            skipped,
            batches,
            "migration completed"
        );

        Ok(MigrationReport {
            completed: true,
            abort_reason: None,
            total_input,
            total_processed,
            skipped,
            batches,
            checkpoints_written,
            resumed_from,
        })
    }

    fn emit_progress(
        &mut self,
        index: u64,
        total_processed: u64,
        start_index: u64,
        run_start: Instant,
        last_ok: &Option<String>,
    ) {
        let elapsed = run_start.elapsed();
        let consumed = index.saturating_sub(start_index);
        let throughput = if elapsed.as_secs_f64() > 0.0 {
            consumed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let memory = self
            .governor
            .as_ref()
            .map(|g| g.last_memory_bytes())
            .unwrap_or(0);
        let _ = self.sink.emit(&HeartbeatRecord::Progress {
            run_id: self.run_id,
            index,
            total_processed,
            elapsed_ms: elapsed.as_millis() as u64,
            throughput_per_sec: throughput,
            memory_bytes: memory,
            last_successful_node_id: last_ok.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Graceful stop: record the reason, keep the last checkpoint untouched,
    /// drop the unflushed batch.
    #[allow(clippy::too_many_arguments)]
    fn abort(
        &mut self,
        reason: AbortReason,
        index: u64,
        total_input: u64,
        total_processed: u64,
        skipped: u64,
        batches: u64,
        checkpoints_written: u64,
        resumed_from: Option<u64>,
    ) -> Result<MigrationReport, PipelineError> {
        self.state = MigrationState::Aborted;
        let reason_text = match &reason {
            AbortReason::ResourceLimit(detail) => detail.clone(),
            AbortReason::Cancelled => "cancelled by caller".to_string(),
        };
        let _ = self.sink.emit(&HeartbeatRecord::Abort {
            run_id: self.run_id,
            index,
            reason: reason_text.clone(),
            timestamp: Utc::now(),
        });
        tracing::warn!(index, reason = %reason_text, "migration aborted, checkpoint preserved");

        Ok(MigrationReport {
            completed: false,
            abort_reason: Some(reason),
            total_input,
            total_processed,
            skipped,
            batches,
            checkpoints_written,
            resumed_from,
        })
    }
}

// ============================================================================
// Output file helpers
// ============================================================================

/// Append the batch to the NDJSON output and clear it.
fn flush_output(path: &Path, batch: &mut Vec<String>) -> Result<(), PipelineError> {
    if batch.is_empty() {
        return Ok(());
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = std::io::BufWriter::new(file);
    for line in batch.iter() {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    batch.clear();
    Ok(())
}

/// Trim the output file to the checkpointed line count. Lines past the
/// checkpoint exist only when a crash landed between a flush and its
/// checkpoint write; dropping them keeps resumed output byte-identical.
fn truncate_output(path: &Path, keep_lines: u64) -> Result<(), PipelineError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && keep_lines == 0 => {
            std::fs::File::create(path)?;
            return Ok(());
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::Corruption(format!(
                "checkpoint expects {} output lines but {} is missing",
                keep_lines,
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let lines: Vec<&str> = contents.lines().collect();
    if (lines.len() as u64) < keep_lines {
        return Err(PipelineError::Corruption(format!(
            "output {} has {} lines, checkpoint expects {}",
            path.display(),
            lines.len(),
            keep_lines
        )));
    }
    if lines.len() as u64 == keep_lines {
        return Ok(());
    }

    let mut kept: String = lines[..keep_lines as usize].join("\n");
    if keep_lines > 0 {
        kept.push('\n');
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.ndjson".to_string());
    let tmp = path.with_file_name(format!("{}.tmp", file_name));
    std::fs::write(&tmp, kept)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
