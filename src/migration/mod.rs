//! Bounded-memory migration pipeline.
//!
//! - [`engine`] — batch loop, resume, abort semantics
//! - [`checkpoint`] — atomic durable progress markers
//! - [`heartbeat`] — NDJSON run telemetry sinks
//! - [`transform`] — per-node validation and output schema

pub mod checkpoint;
pub mod engine;
pub mod heartbeat;
pub mod transform;

pub use checkpoint::MigrationCheckpoint;
pub use engine::{
    AbortReason, MigrationConfig, MigrationEngine, MigrationReport, MigrationState,
};
pub use heartbeat::{
    FileHeartbeatSink, HeartbeatRecord, HeartbeatSink, MemoryHeartbeatSink, NullHeartbeatSink,
};
pub use transform::{MigratedNode, NodeIssue};
