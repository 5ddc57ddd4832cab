//! Dual-track failover harness.
//!
//! Wraps an engine operation so that a slow or failing "new" implementation
//! is timed and, on timeout or error, the designated legacy implementation
//! runs instead. Failovers are counted and timestamped on the harness — no
//! package-level state.
//!
//! The harness is a standalone capability for callers rolling out a
//! replacement implementation next to a proven one; the stock CLI commands
//! run a single implementation and do not construct one. Wrap any pair of
//! futures returning the same `Result` type, e.g. an experimental transform
//! against the current one:
//!
//! ```no_run
//! # use resonance_graph::governor::DualTrack;
//! # use resonance_graph::error::PipelineError;
//! # use std::time::Duration;
//! # async fn demo() -> Result<(), PipelineError> {
//! # async fn new_transform() -> Result<u64, PipelineError> { Ok(1) }
//! # async fn current_transform() -> Result<u64, PipelineError> { Ok(1) }
//! let mut track = DualTrack::new(Duration::from_secs(30));
//! let migrated = track.run(new_transform(), current_transform()).await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

use crate::error::PipelineError;

/// Why the primary track was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverCause {
    Timeout,
    Error(String),
}

/// Runs a primary future under a timeout with a legacy fallback.
pub struct DualTrack {
    timeout: Duration,
    failover_count: u64,
    last_failover_at: Option<DateTime<Utc>>,
    last_failover_cause: Option<FailoverCause>,
}

impl DualTrack {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            failover_count: 0,
            last_failover_at: None,
            last_failover_cause: None,
        }
    }

    /// Run `primary` under the configured timeout; on timeout or error, run
    /// `legacy` and record the failover.
    ///
    /// A legacy failure propagates as-is — there is nothing further to fall
    /// back to.
    pub async fn run<T, P, L>(&mut self, primary: P, legacy: L) -> Result<T, PipelineError>
    where
        P: Future<Output = Result<T, PipelineError>>,
        L: Future<Output = Result<T, PipelineError>>,
    {
        let cause = match tokio::time::timeout(self.timeout, primary).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => FailoverCause::Error(e.to_string()),
            Err(_) => FailoverCause::Timeout,
        };

        self.failover_count += 1;
        self.last_failover_at = Some(Utc::now());
        tracing::warn!(
            cause = ?cause,
            failover_count = self.failover_count,
            "primary implementation failed over to legacy"
        );
        self.last_failover_cause = Some(cause);

        legacy.await
    }

    pub fn failover_count(&self) -> u64 {
        self.failover_count
    }

    pub fn last_failover_at(&self) -> Option<DateTime<Utc>> {
        self.last_failover_at
    }

    pub fn last_failover_cause(&self) -> Option<&FailoverCause> {
        self.last_failover_cause.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok(value: u32) -> Result<u32, PipelineError> {
        Ok(value)
    }

    async fn slow(value: u32, delay: Duration) -> Result<u32, PipelineError> {
        tokio::time::sleep(delay).await;
        Ok(value)
    }

    async fn failing() -> Result<u32, PipelineError> {
        Err(PipelineError::Corruption("primary broke".into()))
    }

    #[tokio::test]
    async fn test_primary_success_no_failover() {
        let mut track = DualTrack::new(Duration::from_millis(100));
        let result = track.run(ok(1), ok(2)).await.unwrap();
        assert_eq!(result, 1);
        assert_eq!(track.failover_count(), 0);
        assert!(track.last_failover_at().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_to_legacy() {
        let mut track = DualTrack::new(Duration::from_millis(50));
        let result = track
            .run(slow(1, Duration::from_secs(10)), ok(2))
            .await
            .unwrap();
        assert_eq!(result, 2);
        assert_eq!(track.failover_count(), 1);
        assert_eq!(track.last_failover_cause(), Some(&FailoverCause::Timeout));
        assert!(track.last_failover_at().is_some());
    }

    #[tokio::test]
    async fn test_error_falls_back_to_legacy() {
        let mut track = DualTrack::new(Duration::from_millis(100));
        let result = track.run(failing(), ok(7)).await.unwrap();
        assert_eq!(result, 7);
        assert_eq!(track.failover_count(), 1);
        assert!(matches!(
            track.last_failover_cause(),
            Some(FailoverCause::Error(_))
        ));
    }

    #[tokio::test]
    async fn test_failover_count_accumulates() {
        let mut track = DualTrack::new(Duration::from_millis(100));
        track.run(failing(), ok(1)).await.unwrap();
        track.run(failing(), ok(1)).await.unwrap();
        track.run(ok(1), ok(2)).await.unwrap();
        assert_eq!(track.failover_count(), 2);
    }

    #[tokio::test]
    async fn test_legacy_failure_propagates() {
        let mut track = DualTrack::new(Duration::from_millis(100));
        let result = track.run(failing(), failing()).await;
        assert!(result.is_err());
        assert_eq!(track.failover_count(), 1);
    }
}
