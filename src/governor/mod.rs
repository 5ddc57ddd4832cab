//! Resource governance — memory ceilings, throttling, and failover.
//!
//! - [`monitor`] — `HardwareMonitor` capability (sysinfo-backed + scripted)
//! - [`governor`] — throttle / hard-kill verdicts consumed at batch boundaries
//! - [`failover`] — dual-track harness falling back to a legacy
//!   implementation on timeout or error

pub mod failover;
#[allow(clippy::module_inception)]
pub mod governor;
pub mod monitor;

pub use failover::{DualTrack, FailoverCause};
pub use governor::{GovernorConfig, GovernorVerdict, ResourceGovernor};
pub use monitor::{HardwareMonitor, ResourceSample, ScriptedMonitor, SystemMonitor};
