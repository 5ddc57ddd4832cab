//! Pipeline error taxonomy.
//!
//! Four failure classes with distinct propagation rules:
//! - [`PipelineError::Validation`] — malformed node; callers skip, log, continue
//! - [`PipelineError::Corruption`] — structural inconsistency; abort the run,
//!   preserve the last checkpoint
//! - [`PipelineError::ResourceLimit`] — hard-kill threshold crossed; abort
//!   gracefully with the checkpoint intact
//! - [`PipelineError::Io`] / [`PipelineError::Malformed`] — missing or
//!   unreadable input; fatal for the primary node source, degraded to an
//!   empty collection for secondary sources

use thiserror::Error;

/// Run-level and node-level pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A single node failed validation. Never aborts a run on its own.
    #[error("validation failed for node {id:?}: {reason}")]
    Validation { id: String, reason: String },

    /// Structural inconsistency (e.g. a self-referential adjacency list).
    /// Aborts the run; the last checkpoint stays intact.
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// The resource governor crossed its hard-kill threshold.
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// Fatal I/O failure on a primary input or output artifact.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A primary input parsed but did not match its schema.
    #[error("malformed input {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    /// True for failures that abort a whole run (as opposed to per-node skips).
    pub fn is_run_fatal(&self) -> bool {
        !matches!(self, PipelineError::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_not_run_fatal() {
        let err = PipelineError::Validation {
            id: "n1".into(),
            reason: "empty id".into(),
        };
        assert!(!err.is_run_fatal());
    }

    #[test]
    fn test_run_level_errors_are_fatal() {
        assert!(PipelineError::Corruption("self-loop".into()).is_run_fatal());
        assert!(PipelineError::ResourceLimit("1.2 GiB".into()).is_run_fatal());
        let io = PipelineError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.is_run_fatal());
    }

    #[test]
    fn test_error_display_includes_reason() {
        let err = PipelineError::Validation {
            id: "tools::vpn".into(),
            reason: "empty id".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tools::vpn"));
        assert!(msg.contains("empty id"));
    }
}
