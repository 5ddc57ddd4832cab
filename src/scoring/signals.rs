//! Usage signal schema and ingestion.
//!
//! Signals are append-only aggregate observations (no PII) keyed by node ID
//! or path. They are never mutated; the scorer folds them into node scores.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

/// One observed usage event for a node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    /// Target node ID. Resolution tries this before `path`.
    #[serde(default)]
    pub node_id: Option<String>,
    /// Target content path, matched after normalization.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    /// Click-through rate. Derived as `clicks / impressions` when absent.
    #[serde(default)]
    pub ctr: Option<f64>,
    #[serde(default)]
    pub dwell_seconds: f64,
    #[serde(default)]
    pub traversal_depth: u32,
    #[serde(default)]
    pub return_visits: u32,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// Effective click-through rate: the explicit value if present, otherwise
    /// `clicks / impressions` (0.0 when there are no impressions).
    pub fn effective_ctr(&self) -> f64 {
        match self.ctr {
            Some(ctr) => ctr,
            None if self.impressions > 0 => self.clicks as f64 / self.impressions as f64,
            None => 0.0,
        }
    }
}

/// Read a signals file (`[]Signal`). Missing or malformed input degrades to
/// an empty batch with a warning — signals are never a fatal input.
pub fn read_signals(path: &Path) -> Vec<Signal> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(signals) => signals,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "malformed signals file, using empty");
                Vec::new()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable signals file, using empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctr_derived_from_counts() {
        let signal: Signal = serde_json::from_str(
            r#"{"nodeId":"a","impressions":1000,"clicks":100,"timestamp":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!((signal.effective_ctr() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_ctr_explicit_wins() {
        let signal: Signal = serde_json::from_str(
            r#"{"nodeId":"a","impressions":10,"clicks":9,"ctr":0.5,"timestamp":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!((signal.effective_ctr() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ctr_zero_impressions() {
        let signal: Signal = serde_json::from_str(
            r#"{"nodeId":"a","clicks":3,"timestamp":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!((signal.effective_ctr() - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_read_signals_missing_file() {
        let signals = read_signals(Path::new("/tmp/definitely-missing-signals-98431.json"));
        assert!(signals.is_empty());
    }
}
