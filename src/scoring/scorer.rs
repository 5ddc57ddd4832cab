//! Signal-driven resonance scoring and time decay.
//!
//! ## Scoring pass
//!
//! Each signal resolves to a node (ID first, normalized path fallback;
//! unresolvable signals are dropped and counted). The node's resonance is
//! raised by a capped linear boost and `last_updated` is set to the signal
//! timestamp.
//!
//! ## Decay pass
//!
//! After all signals, every node decays exactly once:
//! - never-observed nodes (no `last_updated` at all): fixed idle step, decay
//!   score capped at 0.3
//! - observed nodes: age-proportional decay, capped at 0.5, assigned (not
//!   accumulated)
//!
//! The resonance floor of 0.5 is absolute — no sequence of signals or decay
//! applications takes a score below it.
//!
//! All coefficients are ad hoc constants inherited from the original scoring
//! model; they are preserved as configurable defaults rather than derived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::Registry;

use super::signals::Signal;

// ============================================================================
// Configuration
// ============================================================================

/// Tuning parameters for the resonance boost and decay formulas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// CTR contribution cap (default 0.25) and weight (default 4.0).
    pub ctr_cap: f64,
    pub ctr_weight: f64,
    /// Dwell contribution cap in minutes (default 5.0) and weight (default 0.3).
    pub dwell_cap_minutes: f64,
    pub dwell_weight: f64,
    /// Traversal depth cap (default 5) and weight (default 0.15).
    pub depth_cap: f64,
    pub depth_weight: f64,
    /// Return visit cap (default 5) and weight (default 0.2).
    pub return_cap: f64,
    pub return_weight: f64,
    /// Absolute resonance floor (default 0.5).
    pub floor: f64,
    /// Idle path: per-run decay step (default 0.05) and decay-score cap (default 0.3).
    pub idle_decay_step: f64,
    pub idle_decay_cap: f64,
    /// Age path: decay per day since last update (default 0.01), cap (default 0.5).
    pub age_decay_per_day: f64,
    pub age_decay_cap: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ctr_cap: 0.25,
            ctr_weight: 4.0,
            dwell_cap_minutes: 5.0,
            dwell_weight: 0.3,
            depth_cap: 5.0,
            depth_weight: 0.15,
            return_cap: 5.0,
            return_weight: 0.2,
            floor: 0.5,
            idle_decay_step: 0.05,
            idle_decay_cap: 0.3,
            age_decay_per_day: 0.01,
            age_decay_cap: 0.5,
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Totals reported by one scoring run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoringSummary {
    pub signals_applied: usize,
    pub signals_dropped: usize,
    /// Nodes that took the fixed idle-decay path (never observed).
    pub idle_decayed: usize,
    /// Nodes that took the age-proportional decay path.
    pub age_decayed: usize,
}

// ============================================================================
// Scorer
// ============================================================================

/// Applies usage signals and decay to a registry.
pub struct ResonanceScorer {
    config: ScoringConfig,
}

impl ResonanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Boost contributed by one signal:
    /// `min(ctr, ctr_cap)*ctr_weight + min(dwell_min, dwell_cap)*dwell_weight
    ///  + min(depth, depth_cap)*depth_weight + min(returns, return_cap)*return_weight`
    pub fn score_boost(&self, signal: &Signal) -> f64 {
        let c = &self.config;
        signal.effective_ctr().min(c.ctr_cap) * c.ctr_weight
            + (signal.dwell_seconds / 60.0).min(c.dwell_cap_minutes) * c.dwell_weight
            + (signal.traversal_depth as f64).min(c.depth_cap) * c.depth_weight
            + (signal.return_visits as f64).min(c.return_cap) * c.return_weight
    }

    /// Apply one batch of signals. Unresolvable signals are dropped silently
    /// (counted in the summary, logged at debug).
    pub fn apply_signals(&self, registry: &mut Registry, signals: &[Signal]) -> ScoringSummary {
        let mut summary = ScoringSummary::default();
        for signal in signals {
            let Some(idx) = registry.resolve(signal.node_id.as_deref(), signal.path.as_deref())
            else {
                tracing::debug!(
                    node_id = ?signal.node_id,
                    path = ?signal.path,
                    "signal target unresolved, dropped"
                );
                summary.signals_dropped += 1;
                continue;
            };

            let boost = self.score_boost(signal);
            let node = registry.node_mut(idx);
            node.resonance_score = (node.resonance_score + boost).max(self.config.floor);
            node.last_updated = Some(signal.timestamp);
            summary.signals_applied += 1;
        }
        summary
    }

    /// Apply decay to every node exactly once, relative to `now`.
    pub fn apply_decay(&self, registry: &mut Registry, now: DateTime<Utc>) -> ScoringSummary {
        let c = &self.config;
        let mut summary = ScoringSummary::default();
        for node in registry.nodes_mut() {
            match node.last_updated {
                None => {
                    node.decay_score = (node.decay_score + c.idle_decay_step).min(c.idle_decay_cap);
                    node.resonance_score =
                        (node.resonance_score - c.idle_decay_step).max(c.floor);
                    summary.idle_decayed += 1;
                }
                Some(last) => {
                    let age_days = (now - last).num_seconds().max(0) as f64 / 86_400.0;
                    let decay = (age_days * c.age_decay_per_day).min(c.age_decay_cap);
                    node.decay_score = decay;
                    node.resonance_score = (node.resonance_score - decay).max(c.floor);
                    summary.age_decayed += 1;
                }
            }
        }
        summary
    }

    /// Full scoring run: signals first, then one decay pass.
    pub fn run(
        &self,
        registry: &mut Registry,
        signals: &[Signal],
        now: DateTime<Utc>,
    ) -> ScoringSummary {
        let mut summary = self.apply_signals(registry, signals);
        let decay = self.apply_decay(registry, now);
        summary.idle_decayed = decay.idle_decayed;
        summary.age_decayed = decay.age_decayed;
        tracing::info!(
            applied = summary.signals_applied,
            dropped = summary.signals_dropped,
            idle_decayed = summary.idle_decayed,
            age_decayed = summary.age_decayed,
            "scoring run complete"
        );
        summary
    }
}

// ============================================================================
// Tests
// ============================================================================
