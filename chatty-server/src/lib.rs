//! chatty-server - HTTP and WebSocket front end for the chatty relay
//!
//! This crate owns the [`chatty_core::Relay`] and exposes it to clients:
//! username admission, the `/registered-user` WebSocket, and presence
//! listing. All routing and liveness logic lives in chatty-core.

mod error;
pub mod http;
mod state;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use chatty_core::RelayConfig;
use tokio::net::TcpListener;

pub use error::{ErrorResponse, ServerError};
pub use http::{FriendsResponse, HealthResponse, create_router};
pub use state::AppState;

/// Default host for the chatty server
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the chatty server
pub const DEFAULT_PORT: u16 = 8080;

/// The main chatty server
pub struct ChattyServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl ChattyServer {
    /// Create a new server with state built from the config
    pub fn new(config: ServerConfig) -> Self {
        let state = Arc::new(AppState::with_config(config.relay.clone()));
        Self { config, state }
    }

    /// Create a server with custom state (for testing)
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        self.run_with_listener(listener).await
    }

    /// Run the server on an already bound listener
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!("chatty server listening on {}", addr);

        // The sweep lives as long as the server does.
        let monitor = self.state.relay.start_liveness_monitor();

        let router = create_router(self.state);
        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| ServerError::Internal(e.to_string()));

        monitor.abort();
        result
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Relay tuning
    pub relay: RelayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            relay: RelayConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            relay: RelayConfig::default(),
        }
    }

    /// Replace the relay settings
    pub fn with_relay(mut self, relay: RelayConfig) -> Self {
        self.relay = relay;
        self
    }

    /// Returns the socket address string (e.g., "0.0.0.0:8080")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
