//! Resource governor — throttle and hard-kill thresholds.
//!
//! Samples process memory through a [`HardwareMonitor`] and turns the
//! reading into a verdict consumed at batch boundaries:
//!
//! - below the throttle threshold → [`GovernorVerdict::Proceed`]
//! - at/above throttle, below hard-kill → [`GovernorVerdict::Throttle`]
//!   (caller inserts the configured delay before the next batch)
//! - at/above hard-kill → [`GovernorVerdict::HardKill`] (caller aborts,
//!   preserving the last good checkpoint)
//!
//! The governor holds no global state; construct one per run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::monitor::{HardwareMonitor, ResourceSample};

/// Memory ceilings and throttle pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Throttle threshold in bytes (default 512 MiB).
    pub throttle_bytes: u64,
    /// Hard-kill threshold in bytes (default 1 GiB).
    pub hard_kill_bytes: u64,
    /// Delay inserted between batches while throttled (default 250 ms).
    pub throttle_delay_ms: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            throttle_bytes: 512 * 1024 * 1024,
            hard_kill_bytes: 1024 * 1024 * 1024,
            throttle_delay_ms: 250,
        }
    }
}

/// Decision for the next batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GovernorVerdict {
    Proceed,
    /// Slow the batch cadence by the given delay.
    Throttle(Duration),
    /// Abort immediately; the observed memory reading is carried for the log.
    HardKill { memory_bytes: u64 },
}

/// Enforces the memory ceilings for one run.
pub struct ResourceGovernor {
    monitor: Box<dyn HardwareMonitor>,
    config: GovernorConfig,
    last_sample: Option<ResourceSample>,
}

impl ResourceGovernor {
    pub fn new(monitor: Box<dyn HardwareMonitor>, config: GovernorConfig) -> Self {
        Self {
            monitor,
            config,
            last_sample: None,
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Take a fresh sample and return the verdict for the next batch.
    pub fn check(&mut self) -> GovernorVerdict {
        let sample = self.monitor.sample();
        let memory = sample.memory_bytes;
        self.last_sample = Some(sample);

        if memory >= self.config.hard_kill_bytes {
            tracing::error!(
                memory_bytes = memory,
                hard_kill_bytes = self.config.hard_kill_bytes,
                "hard-kill threshold crossed"
            );
            GovernorVerdict::HardKill { memory_bytes: memory }
        } else if memory >= self.config.throttle_bytes {
            tracing::warn!(
                memory_bytes = memory,
                throttle_bytes = self.config.throttle_bytes,
                "throttle threshold crossed, slowing batch cadence"
            );
            GovernorVerdict::Throttle(Duration::from_millis(self.config.throttle_delay_ms))
        } else {
            GovernorVerdict::Proceed
        }
    }

    /// Most recent memory reading (0 before the first check). Reported in
    /// heartbeats.
    pub fn last_memory_bytes(&self) -> u64 {
        self.last_sample.map(|s| s.memory_bytes).unwrap_or(0)
    }
}
