//! chatty-core: connection registry, routing and liveness for the chatty relay
//!
//! Clients identify themselves by a unique username, keep one persistent
//! connection, and exchange JSON envelopes routed by recipient name. This
//! crate holds everything that involves concurrency:
//!
//! - **Sessions** - [`Session`] pairs a username with the write half of its
//!   connection, a liveness timestamp and a write lock
//! - **Registry** - [`Registry`] maps usernames to live sessions
//! - **Routing** - [`MessageRouter`] runs each session's receive loop and
//!   forwards envelopes verbatim
//! - **Liveness** - [`LivenessMonitor`] evicts sessions that went silent
//! - **Presence** - [`Presence`] answers "is this name taken" and "who is online"
//!
//! [`Relay`] bundles them into the context object the server holds.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chatty_core::{Frame, MemorySink, Relay, RelayConfig, TransportError};
//! use tokio_stream::wrappers::UnboundedReceiverStream;
//!
//! async fn example() {
//!     let relay = Arc::new(Relay::new(RelayConfig::default()));
//!     let _monitor = relay.start_liveness_monitor();
//!
//!     let (sink, _outbound) = MemorySink::new();
//!     let (_tx, rx) = tokio::sync::mpsc::unbounded_channel::<Result<Frame, TransportError>>();
//!     let termination = relay
//!         .attach("alice", sink, UnboundedReceiverStream::new(rx))
//!         .await;
//!     println!("alice left: {:?}", termination);
//! }
//! ```
//!
//! # Locking
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Registry (one mutex)         │  membership only, never held across I/O
//! │  ┌────────────┐ ┌──────────┐ │
//! │  │ Session    │ │ Session  │ │
//! │  │ write lock │ │ write ...│ │  guards that session's sink only
//! │  └────────────┘ └──────────┘ │
//! └──────────────────────────────┘
//! ```
//!
//! The registry lock is never acquired while a session write lock is held.

pub mod config;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod liveness;
pub mod presence;
pub mod registry;
pub mod relay;
pub mod router;
pub mod session;

pub use config::RelayConfig;
pub use connection::{Frame, FrameSink, MemorySink};
pub use envelope::{Envelope, MessageKind};
pub use error::{EnvelopeError, RelayError, TransportError};
pub use liveness::LivenessMonitor;
pub use presence::Presence;
pub use registry::Registry;
pub use relay::Relay;
pub use router::{Dispatch, MessageRouter, Termination};
pub use session::{CLOSE_TIMEOUT, Session, SessionId};
