//! Liveness monitor: periodic eviction of silent sessions
//!
//! Catches peers that neither log out nor produce a read error, such as
//! half-open TCP connections.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::registry::Registry;

/// Background sweep over the registry
pub struct LivenessMonitor {
    registry: Arc<Registry>,
    interval: Duration,
    timeout: Duration,
}

impl LivenessMonitor {
    pub fn new(registry: Arc<Registry>, interval: Duration, timeout: Duration) -> Self {
        Self {
            registry,
            interval,
            timeout,
        }
    }

    /// Evict sessions inactive as of now
    pub async fn sweep(&self) -> Vec<String> {
        self.sweep_at(Instant::now()).await
    }

    /// Evict every session whose last activity is older than the timeout at `now`
    ///
    /// Sessions are removed under the registry lock. Each one is marked closed
    /// before this returns; closing its connection happens on a background
    /// task so an unresponsive peer cannot hold up the sweep. Returns the
    /// evicted usernames.
    pub async fn sweep_at(&self, now: Instant) -> Vec<String> {
        let evicted = self.registry.take_inactive(now, self.timeout).await;

        let mut usernames = Vec::with_capacity(evicted.len());
        for session in evicted {
            info!("Client {} timed out due to inactivity", session.username());
            session.close_in_background();
            usernames.push(session.username().to_string());
        }
        usernames
    }

    /// Run the sweep loop for the lifetime of the runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let evicted = self.sweep().await;
                debug!(evicted = evicted.len(), "Liveness sweep complete");
            }
        })
    }
}
