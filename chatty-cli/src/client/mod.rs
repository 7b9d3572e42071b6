//! Client side of the relay for `chatty chat`
//!
//! Provides ChattyClient for the admission check, the WebSocket session and
//! presence lookups.

mod connection;

pub use connection::{ChattyClient, UsernameStatus};
