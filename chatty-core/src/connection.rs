//! Connection seam between the relay and its transport
//!
//! A connection is split in two: the read half is any stream of
//! `Result<Frame, TransportError>` owned by exactly one receive loop, and the
//! write half is a [`FrameSink`] that lives inside the session behind its
//! write lock.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// One unit read from or written to a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame
    Text(String),
    /// Binary frame
    Binary(Vec<u8>),
    /// Transport-level keepalive (ping/pong); counts as activity, never routed
    Heartbeat,
}

impl Frame {
    /// Raw bytes carried by a data frame
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Frame::Text(text) => Some(text.as_bytes()),
            Frame::Binary(bytes) => Some(bytes),
            Frame::Heartbeat => None,
        }
    }
}

/// Write half of a connection
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Write one frame to the peer
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Close the connection; later sends fail
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// In-memory sink delivering frames to a channel
///
/// Closing the sink drops the sender, so the paired receiver yields `None`
/// once it has drained what was written.
pub struct MemorySink {
    tx: Option<mpsc::UnboundedSender<Frame>>,
}

impl MemorySink {
    /// Create a sink and the receiver observing it
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame)
            .map_err(|_| TransportError::Write("receiver dropped".to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx.take();
        Ok(())
    }
}

/// Sink whose writes and close never complete, like a peer that stopped reading
#[cfg(test)]
pub(crate) struct StalledSink;

#[cfg(test)]
#[async_trait]
impl FrameSink for StalledSink {
    async fn send(&mut self, _frame: Frame) -> Result<(), TransportError> {
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        std::future::pending().await
    }
}
