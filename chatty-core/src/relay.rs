//! Relay: the context object owning the registry and its workers

use std::sync::Arc;

use futures::Stream;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::connection::{Frame, FrameSink};
use crate::error::{RelayError, TransportError};
use crate::liveness::LivenessMonitor;
use crate::presence::Presence;
use crate::registry::Registry;
use crate::router::{MessageRouter, Termination};
use crate::session::Session;

/// Presence-aware point-to-point relay
///
/// Owns the [`Registry`] and hands it to the router, the liveness monitor and
/// presence queries. Share it behind an `Arc`.
pub struct Relay {
    config: RelayConfig,
    registry: Arc<Registry>,
    router: MessageRouter,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        let registry = Arc::new(Registry::new());
        let router = MessageRouter::new(registry.clone());
        Self {
            config,
            registry,
            router,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn presence(&self) -> Presence {
        Presence::new(self.registry.clone())
    }

    pub async fn is_registered(&self, username: &str) -> bool {
        self.registry.is_registered(username).await
    }

    pub async fn online_peers(&self, excluding: &str) -> Vec<String> {
        self.registry.snapshot(excluding).await
    }

    /// Register a connection under `username` and run its receive loop
    ///
    /// Returns once the session has terminated. When the name was taken in
    /// the meantime the sink is closed and no loop is started.
    pub async fn attach<S, I>(
        &self,
        username: impl Into<String>,
        sink: S,
        inbound: I,
    ) -> Result<Termination, RelayError>
    where
        S: FrameSink,
        I: Stream<Item = Result<Frame, TransportError>> + Send,
    {
        let session = Arc::new(Session::new(username, sink));

        if !self.registry.register(session.clone()).await {
            warn!(
                "Rejected connection for {}: already connected",
                session.username()
            );
            session.close().await;
            return Err(RelayError::UsernameTaken(session.username().to_string()));
        }

        info!("Client connected: {}", session.username());
        Ok(self.router.run(session, inbound).await)
    }

    /// Start the background liveness sweep
    pub fn start_liveness_monitor(&self) -> JoinHandle<()> {
        info!(
            interval_secs = self.config.sweep_interval().as_secs(),
            timeout_secs = self.config.inactivity_timeout().as_secs(),
            "Starting liveness monitor"
        );
        LivenessMonitor::new(
            self.registry.clone(),
            self.config.sweep_interval(),
            self.config.inactivity_timeout(),
        )
        .spawn()
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MemorySink;
    use crate::envelope::Envelope;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    type Inbound = mpsc::UnboundedSender<Result<Frame, TransportError>>;

    fn connect(
        relay: &Arc<Relay>,
        username: &str,
    ) -> (
        Inbound,
        mpsc::UnboundedReceiver<Frame>,
        JoinHandle<Result<Termination, RelayError>>,
    ) {
        let (sink, outbound) = MemorySink::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let relay = relay.clone();
        let username = username.to_string();
        let handle = tokio::spawn(async move {
            relay
                .attach(username, sink, UnboundedReceiverStream::new(rx))
                .await
        });
        (tx, outbound, handle)
    }

    async fn wait_until_registered(relay: &Relay, username: &str) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !relay.is_registered(username).await {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("user never registered");
    }

    #[tokio::test]
    async fn chat_then_logout_scenario() {
        let relay = Arc::new(Relay::default());
        let (alice_tx, _alice_out, _alice) = connect(&relay, "alice");
        let (bob_tx, mut bob_out, bob) = connect(&relay, "bob");
        wait_until_registered(&relay, "alice").await;
        wait_until_registered(&relay, "bob").await;

        assert_eq!(relay.online_peers("alice").await, vec!["bob"]);

        let hi = Envelope::chat("12:00", "alice", "bob", "hi").encode().unwrap();
        alice_tx.send(Ok(Frame::Text(hi.clone()))).unwrap();
        assert_eq!(bob_out.recv().await, Some(Frame::Text(hi)));

        let bye = Envelope::logout("12:01", "bob").encode().unwrap();
        bob_tx.send(Ok(Frame::Text(bye))).unwrap();

        assert_eq!(bob.await.unwrap(), Ok(Termination::Logout));
        assert_eq!(bob_out.recv().await, None);
        assert!(relay.online_peers("alice").await.is_empty());
    }

    #[tokio::test]
    async fn attach_rejects_taken_username_and_closes_sink() {
        let relay = Arc::new(Relay::default());
        let (_tx, _out, _first) = connect(&relay, "alice");
        wait_until_registered(&relay, "alice").await;

        let (_tx2, mut out2, second) = connect(&relay, "alice");

        assert_eq!(
            second.await.unwrap(),
            Err(RelayError::UsernameTaken("alice".to_string()))
        );
        assert_eq!(out2.recv().await, None);
        assert!(relay.is_registered("alice").await);
    }

    #[tokio::test]
    async fn presence_handle_shares_registry() {
        let relay = Arc::new(Relay::default());
        let presence = relay.presence();
        let (_tx, _out, _handle) = connect(&relay, "carol");
        wait_until_registered(&relay, "carol").await;

        assert!(presence.is_registered("carol").await);
        assert_eq!(presence.online_count().await, 1);
    }

    #[tokio::test]
    async fn liveness_monitor_survives_huge_sweep_interval() {
        let relay = Relay::new(RelayConfig {
            sweep_interval_secs: u64::MAX,
            ..RelayConfig::default()
        });

        let handle = relay.start_liveness_monitor();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!handle.is_finished());
        handle.abort();
    }
}
