//! Shared application state for the chatty server

use std::sync::Arc;

use chatty_core::{Relay, RelayConfig};
use chrono::{DateTime, Utc};

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// The relay owning the connection registry
    pub relay: Arc<Relay>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState with default relay settings
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a new AppState with custom relay settings
    pub fn with_config(config: RelayConfig) -> Self {
        Self::with_relay(Arc::new(Relay::new(config)))
    }

    /// Create AppState around an existing relay (for testing)
    pub fn with_relay(relay: Arc<Relay>) -> Self {
        Self {
            relay,
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
