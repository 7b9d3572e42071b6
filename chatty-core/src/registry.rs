//! Connection registry: the single source of truth for who is online
//!
//! All structural access to the table goes through one async mutex. The lock
//! is only held for map operations and is never held across network I/O, so
//! a slow peer can never stall unrelated connections.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::session::Session;

/// Concurrent mapping from username to live [`Session`]
#[derive(Default)]
pub struct Registry {
    table: Mutex<HashMap<String, Arc<Session>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the session unless its username is already taken
    ///
    /// The presence check and the insert happen under one critical section,
    /// so concurrent registrations of the same name cannot both succeed.
    pub async fn register(&self, session: Arc<Session>) -> bool {
        let mut table = self.table.lock().await;
        match table.entry(session.username().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(session);
                true
            }
        }
    }

    /// Get the session registered under `username`
    pub async fn lookup(&self, username: &str) -> Option<Arc<Session>> {
        self.table.lock().await.get(username).cloned()
    }

    /// Remove `username`; removing an absent name is a no-op
    pub async fn remove(&self, username: &str) -> Option<Arc<Session>> {
        self.table.lock().await.remove(username)
    }

    /// Remove the entry for this exact session
    ///
    /// The entry keyed by the session's username is only removed when it still
    /// refers to this session, so a stale teardown never evicts a newer
    /// connection that reused the name.
    pub async fn remove_session(&self, session: &Session) -> bool {
        let mut table = self.table.lock().await;
        match table.get(session.username()) {
            Some(current) if current.id() == session.id() => {
                table.remove(session.username());
                true
            }
            _ => false,
        }
    }

    /// Whether `username` currently has an entry
    pub async fn is_registered(&self, username: &str) -> bool {
        self.table.lock().await.contains_key(username)
    }

    /// Sorted usernames of open sessions, excluding `excluding`
    pub async fn snapshot(&self, excluding: &str) -> Vec<String> {
        let table = self.table.lock().await;
        let mut names: Vec<String> = table
            .iter()
            .filter(|(name, session)| name.as_str() != excluding && !session.is_closed())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Remove and return every session silent for longer than `timeout`
    pub async fn take_inactive(&self, now: Instant, timeout: Duration) -> Vec<Arc<Session>> {
        let mut table = self.table.lock().await;
        let stale: Vec<String> = table
            .iter()
            .filter(|(_, session)| session.is_inactive(now, timeout))
            .map(|(name, _)| name.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|name| table.remove(&name))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MemorySink;

    fn session(username: &str) -> Arc<Session> {
        let (sink, _rx) = MemorySink::new();
        Arc::new(Session::new(username, sink))
    }

    #[tokio::test]
    async fn new_registry_is_empty() {
        let registry = Registry::new();
        assert!(registry.is_empty().await);
        assert!(registry.snapshot("").await.is_empty());
    }

    #[tokio::test]
    async fn register_then_lookup() {
        let registry = Registry::new();
        let alice = session("alice");

        assert!(registry.register(alice.clone()).await);

        let found = registry.lookup("alice").await.unwrap();
        assert_eq!(found.id(), alice.id());
        assert!(registry.is_registered("alice").await);
        assert!(registry.lookup("bob").await.is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let registry = Registry::new();
        let first = session("alice");

        assert!(registry.register(first.clone()).await);
        assert!(!registry.register(session("alice")).await);

        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.lookup("alice").await.unwrap().id(), first.id());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = Registry::new();
        registry.register(session("alice")).await;

        assert!(registry.remove("alice").await.is_some());
        assert!(registry.remove("alice").await.is_none());
        assert!(registry.remove("nobody").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn remove_session_ignores_newer_session_with_same_name() {
        let registry = Registry::new();
        let old = session("alice");
        registry.register(old.clone()).await;
        registry.remove("alice").await;

        let newer = session("alice");
        registry.register(newer.clone()).await;

        assert!(!registry.remove_session(&old).await);
        assert_eq!(registry.lookup("alice").await.unwrap().id(), newer.id());

        assert!(registry.remove_session(&newer).await);
        assert!(!registry.is_registered("alice").await);
    }

    #[tokio::test]
    async fn snapshot_excludes_requester_and_closed_sessions() {
        let registry = Registry::new();
        let carol = session("carol");
        for s in [session("bob"), session("alice"), carol.clone()] {
            registry.register(s).await;
        }

        assert_eq!(registry.snapshot("alice").await, vec!["bob", "carol"]);

        carol.close().await;
        assert_eq!(registry.snapshot("alice").await, vec!["bob"]);
        assert_eq!(registry.snapshot("nobody").await, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn take_inactive_only_removes_stale_sessions() {
        let registry = Registry::new();
        let stale = session("stale");
        let fresh = session("fresh");
        registry.register(stale.clone()).await;
        registry.register(fresh.clone()).await;

        let timeout = Duration::from_secs(120);
        let now = stale.last_active().max(fresh.last_active()) + Duration::from_secs(180);
        fresh.touch_at(now - Duration::from_secs(10));

        let evicted = registry.take_inactive(now, timeout).await;

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].username(), "stale");
        assert!(!registry.is_registered("stale").await);
        assert!(registry.is_registered("fresh").await);
    }
}
