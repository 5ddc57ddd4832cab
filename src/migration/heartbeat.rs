//! Heartbeat log — append-only NDJSON run telemetry.
//!
//! Every skip, abort, progress tick, and run summary is one line-delimited
//! JSON record. The sink is injected into the engine so core logic never
//! hardcodes a destination: a file in production, memory in tests, null for
//! dry runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// One heartbeat log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HeartbeatRecord {
    /// Periodic progress tick (every heartbeat interval).
    #[serde(rename_all = "camelCase")]
    Progress {
        run_id: Uuid,
        index: u64,
        total_processed: u64,
        elapsed_ms: u64,
        throughput_per_sec: f64,
        memory_bytes: u64,
        last_successful_node_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// A node was skipped by validation.
    #[serde(rename_all = "camelCase")]
    Skip {
        run_id: Uuid,
        index: u64,
        node_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// The run aborted.
    #[serde(rename_all = "camelCase")]
    Abort {
        run_id: Uuid,
        index: u64,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// Final run summary.
    #[serde(rename_all = "camelCase")]
    Summary {
        run_id: Uuid,
        total_input: u64,
        total_processed: u64,
        skipped: u64,
        completed: bool,
        timestamp: DateTime<Utc>,
    },
}

/// Destination for heartbeat records.
pub trait HeartbeatSink: Send {
    fn emit(&mut self, record: &HeartbeatRecord) -> std::io::Result<()>;
}

// ============================================================================
// File sink
// ============================================================================

/// Appends one JSON line per record, flushed immediately so the log survives
/// a crash mid-run.
pub struct FileHeartbeatSink {
    writer: BufWriter<std::fs::File>,
}

impl FileHeartbeatSink {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl HeartbeatSink for FileHeartbeatSink {
    fn emit(&mut self, record: &HeartbeatRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

// ============================================================================
// Memory sink (tests)
// ============================================================================

/// Collects records in memory; clones share the same buffer so tests can
/// hand one half to the engine and inspect the other.
#[derive(Clone, Default)]
pub struct MemoryHeartbeatSink {
    records: Arc<Mutex<Vec<HeartbeatRecord>>>,
}

impl MemoryHeartbeatSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<HeartbeatRecord> {
        self.records.lock().expect("heartbeat sink poisoned").clone()
    }
}

impl HeartbeatSink for MemoryHeartbeatSink {
    fn emit(&mut self, record: &HeartbeatRecord) -> std::io::Result<()> {
        self.records
            .lock()
            .expect("heartbeat sink poisoned")
            .push(record.clone());
        Ok(())
    }
}

// ============================================================================
// Null sink
// ============================================================================

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHeartbeatSink;

impl HeartbeatSink for NullHeartbeatSink {
    fn emit(&mut self, _record: &HeartbeatRecord) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(index: u64) -> HeartbeatRecord {
        HeartbeatRecord::Progress {
            run_id: Uuid::nil(),
            index,
            total_processed: index,
            elapsed_ms: 10,
            throughput_per_sec: 100.0,
            memory_bytes: 1024,
            last_successful_node_id: Some("n".into()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_file_sink_appends_ndjson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heartbeat.ndjson");

        {
            let mut sink = FileHeartbeatSink::open(&path).unwrap();
            sink.emit(&progress(1000)).unwrap();
            sink.emit(&progress(2000)).unwrap();
        }
        // Re-open appends, never truncates
        {
            let mut sink = FileHeartbeatSink::open(&path).unwrap();
            sink.emit(&progress(3000)).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        let parsed: HeartbeatRecord = serde_json::from_str(lines[2]).unwrap();
        assert!(matches!(parsed, HeartbeatRecord::Progress { index: 3000, .. }));
    }

    #[test]
    fn test_memory_sink_shared_buffer() {
        let sink = MemoryHeartbeatSink::new();
        let mut handle = sink.clone();
        handle.emit(&progress(500)).unwrap();
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn test_record_tagging() {
        let record = HeartbeatRecord::Skip {
            run_id: Uuid::nil(),
            index: 7,
            node_id: "".into(),
            reason: "empty id".into(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""type":"skip""#));
        assert!(json.contains(r#""reason":"empty id""#));
    }
}
