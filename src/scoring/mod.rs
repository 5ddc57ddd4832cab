//! Signal ingestion and resonance scoring.

pub mod scorer;
pub mod signals;

pub use scorer::{ResonanceScorer, ScoringConfig, ScoringSummary};
pub use signals::{read_signals, Signal};
