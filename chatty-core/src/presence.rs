//! Read-only presence queries over the registry

use std::sync::Arc;

use crate::registry::Registry;

/// Read-only view of the registry used by the collaborator layer
#[derive(Clone)]
pub struct Presence {
    registry: Arc<Registry>,
}

impl Presence {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Whether a session is registered under `username`
    ///
    /// Used to reject duplicate names before a connection is upgraded.
    pub async fn is_registered(&self, username: &str) -> bool {
        self.registry.is_registered(username).await
    }

    /// Usernames the requester can message right now
    ///
    /// Never contains `excluding` itself, nor sessions already being torn down.
    pub async fn online_peers(&self, excluding: &str) -> Vec<String> {
        self.registry.snapshot(excluding).await
    }

    /// Number of registered sessions
    pub async fn online_count(&self) -> usize {
        self.registry.len().await
    }
}
