//! Server-side state for one connected user

use std::fmt;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::connection::{Frame, FrameSink};
use crate::error::TransportError;

/// Longest a close waits for the peer before the connection is abandoned
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Unique identifier of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One connected, identified user
///
/// The write half of the connection sits behind an async mutex so any number
/// of senders can forward to this user; the read half is never stored here,
/// it belongs to the receive loop that owns the session.
pub struct Session {
    id: SessionId,
    username: String,
    sink: tokio::sync::Mutex<Box<dyn FrameSink>>,
    last_active: Mutex<Instant>,
    closed: CancellationToken,
    closing: AtomicBool,
}

impl Session {
    /// Create a session around the write half of a fresh connection
    pub fn new(username: impl Into<String>, sink: impl FrameSink) -> Self {
        Self {
            id: SessionId::new(),
            username: username.into(),
            sink: tokio::sync::Mutex::new(Box::new(sink)),
            last_active: Mutex::new(Instant::now()),
            closed: CancellationToken::new(),
            closing: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Record activity at the current time
    pub fn touch(&self) {
        self.touch_at(Instant::now());
    }

    /// Record activity at `now`; never moves the timestamp backwards
    pub fn touch_at(&self, now: Instant) {
        let mut last_active = self
            .last_active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if now > *last_active {
            *last_active = now;
        }
    }

    pub fn last_active(&self) -> Instant {
        *self
            .last_active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the session has been silent for longer than `timeout` at `now`
    pub fn is_inactive(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_active()) > timeout
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the session has been closed
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Write a frame under this session's write lock
    ///
    /// A write still waiting on the lock or on the peer is abandoned as soon
    /// as the session is closed, which releases the lock.
    pub async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            result = async {
                let mut sink = self.sink.lock().await;
                sink.send(frame).await
            } => result,
        }
    }

    /// Close the connection
    ///
    /// Only the first call has an effect. The cancellation is signalled before
    /// the sink is closed so the owning receive loop wakes up and in-flight
    /// writes are abandoned. Closing the sink is bounded by [`CLOSE_TIMEOUT`].
    pub async fn close(&self) {
        if self.cancel() {
            self.close_sink().await;
        }
    }

    /// Mark the session closed now and close its sink on a background task
    pub fn close_in_background(self: &Arc<Self>) {
        if self.cancel() {
            let session = Arc::clone(self);
            tokio::spawn(async move { session.close_sink().await });
        }
    }

    /// Signal closure; true for the first caller only
    fn cancel(&self) -> bool {
        if self.closing.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.closed.cancel();
        true
    }

    async fn close_sink(&self) {
        let closed = tokio::time::timeout(CLOSE_TIMEOUT, async {
            let mut sink = self.sink.lock().await;
            sink.close().await
        })
        .await;

        match closed {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(username = %self.username, "Error closing connection: {}", e),
            Err(_) => warn!(username = %self.username, "Gave up closing unresponsive connection"),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("closed", &self.is_closed())
            .finish()
    }
}
