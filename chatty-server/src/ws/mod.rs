//! WebSocket module for relayed client connections

mod connection;

pub use connection::ws_handler;
