//! Node registry — content graph loading and the uniform node model.
//!
//! - [`models`] — `Node`, `Registry`, `AnchorSet`, normalization helpers
//! - [`sources`] — explicit schemas for the raw source collections
//! - [`loader`] — normalization and merge into a flat registry

pub mod loader;
pub mod models;
pub mod sources;

pub use loader::{ContentGraphLoader, SourcePaths};
pub use models::{normalize_path, normalize_slug, AnchorSet, Node, NodeKind, Registry};
