//! Relay tuning knobs

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default period between liveness sweeps, in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
/// Default inactivity allowed before eviction, in seconds
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 120;

/// Longest accepted sweep interval, in seconds (one day)
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Configuration for the relay core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Seconds between liveness sweeps
    pub sweep_interval_secs: u64,
    /// Seconds a session may stay silent before it is evicted
    pub inactivity_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
        }
    }
}

impl RelayConfig {
    pub fn sweep_interval(&self) -> Duration {
        // tokio::time::interval panics on a zero period or one that overflows Instant
        Duration::from_secs(self.sweep_interval_secs.clamp(1, MAX_SWEEP_INTERVAL_SECS))
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}
