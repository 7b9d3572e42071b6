//! Message router: the per-session receive loop and forwarding decision

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::connection::Frame;
use crate::envelope::Envelope;
use crate::error::{EnvelopeError, TransportError};
use crate::registry::Registry;
use crate::session::Session;

/// Outcome of dispatching one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Delivered to the receiver's connection
    Forwarded,
    /// Receiver unknown or already closed; message discarded
    Dropped,
    /// Receiver's connection rejected the write; message discarded
    WriteFailed,
    /// Keepalive frame; activity recorded, nothing routed
    Heartbeat,
    /// Sender asked to end its session
    Logout,
}

/// Why a receive loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The session sent a logout envelope
    Logout,
    /// The peer ended the stream cleanly
    Disconnected,
    /// Reading from the connection failed
    ReadFailed(TransportError),
    /// The session was closed from elsewhere (e.g. evicted as inactive)
    Closed,
}

/// Routes envelopes between registered sessions
#[derive(Clone)]
pub struct MessageRouter {
    registry: Arc<Registry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Drive the receive loop for `session` until it terminates
    ///
    /// Every exit path performs the same teardown exactly once: the session
    /// is removed from the registry (by identity) and then closed.
    #[instrument(name = "session", skip_all, fields(username = %session.username(), session_id = %session.id()))]
    pub async fn run<S>(&self, session: Arc<Session>, inbound: S) -> Termination
    where
        S: Stream<Item = Result<Frame, TransportError>> + Send,
    {
        tokio::pin!(inbound);

        let termination = loop {
            let next = tokio::select! {
                biased;
                _ = session.closed() => break Termination::Closed,
                next = inbound.next() => next,
            };

            let frame = match next {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    warn!("Error reading message: {}", e);
                    break Termination::ReadFailed(e);
                }
                None => break Termination::Disconnected,
            };

            match self.dispatch(&session, frame).await {
                Ok(Dispatch::Logout) => break Termination::Logout,
                Ok(_) => {}
                Err(e) => warn!("Discarding message: {}", e),
            }
        };

        self.teardown(&session).await;
        info!(?termination, "Session ended");
        termination
    }

    /// Handle one inbound frame from `session`
    pub async fn dispatch(
        &self,
        session: &Session,
        frame: Frame,
    ) -> Result<Dispatch, EnvelopeError> {
        session.touch();

        let Some(raw) = frame.payload() else {
            return Ok(Dispatch::Heartbeat);
        };
        let envelope = Envelope::decode(raw)?;

        if envelope.is_logout() {
            info!(username = %session.username(), "User logging out");
            return Ok(Dispatch::Logout);
        }

        Ok(self.forward(&envelope.receiver, frame).await)
    }

    /// Forward the original frame to `receiver`, best-effort
    async fn forward(&self, receiver: &str, frame: Frame) -> Dispatch {
        // Registry lock is released before any write happens.
        let target = self.registry.lookup(receiver).await;

        let Some(target) = target.filter(|t| !t.is_closed()) else {
            info!("Receiver {} not found or offline", receiver);
            return Dispatch::Dropped;
        };

        match target.send(frame).await {
            Ok(()) => {
                debug!("Message forwarded to {}", receiver);
                Dispatch::Forwarded
            }
            Err(e) => {
                warn!("Error writing message to {}: {}", receiver, e);
                Dispatch::WriteFailed
            }
        }
    }

    async fn teardown(&self, session: &Session) {
        if self.registry.remove_session(session).await {
            info!("Removed disconnected client: {}", session.username());
        }
        session.close().await;
    }
}
