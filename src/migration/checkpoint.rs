//! Migration checkpoints.
//!
//! A checkpoint is the durable marker of migration progress. Writes are
//! atomic with respect to process crash: serialize to a sibling temp file,
//! then rename over the target — a partially written checkpoint is never
//! visible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PipelineError;

/// Durable progress marker for one migration.
///
/// `last_processed_index` counts input indices consumed (skips included) and
/// is monotone across a run and across resumptions. `total_processed` counts
/// successfully transformed nodes — exactly the number of output lines
/// flushed so far, which is what resumption truncates the output file to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationCheckpoint {
    pub last_processed_index: u64,
    pub total_processed: u64,
    pub last_checkpoint_timestamp: DateTime<Utc>,
    pub last_successful_node_id: Option<String>,
    pub checkpoint_count: u64,
}

impl MigrationCheckpoint {
    /// Atomically replace the checkpoint file (temp + rename).
    pub fn write_atomic(&self, path: &Path) -> Result<(), PipelineError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checkpoint.json".to_string());
        let tmp = path.with_file_name(format!("{}.tmp", file_name));

        let json = serde_json::to_string_pretty(self).map_err(|e| PipelineError::Malformed {
            path: path.display().to_string(),
            source: e,
        })?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load an existing checkpoint. `Ok(None)` when no file exists; an
    /// unparseable checkpoint is corruption (the run is not resumable).
    pub fn load(path: &Path) -> Result<Option<Self>, PipelineError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| PipelineError::Corruption(format!("unreadable checkpoint {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(index: u64) -> MigrationCheckpoint {
        MigrationCheckpoint {
            last_processed_index: index,
            total_processed: index,
            last_checkpoint_timestamp: Utc::now(),
            last_successful_node_id: Some("n1".into()),
            checkpoint_count: 1,
        }
    }

    #[test]
    fn test_write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");

        let cp = checkpoint(5000);
        cp.write_atomic(&path).unwrap();

        let loaded = MigrationCheckpoint::load(&path).unwrap().unwrap();
        assert_eq!(loaded, cp);
        // No temp residue left behind
        assert!(!path.with_file_name("checkpoint.json.tmp").exists());
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = MigrationCheckpoint::load(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_corrupt_is_corruption_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "{truncated").unwrap();

        let err = MigrationCheckpoint::load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Corruption(_)));
    }

    #[test]
    fn test_rewrite_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");

        checkpoint(1000).write_atomic(&path).unwrap();
        checkpoint(2000).write_atomic(&path).unwrap();

        let loaded = MigrationCheckpoint::load(&path).unwrap().unwrap();
        assert_eq!(loaded.last_processed_index, 2000);
    }
}
