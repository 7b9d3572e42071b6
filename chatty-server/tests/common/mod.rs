//! Shared test utilities for chatty-server integration tests

pub mod client;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chatty_core::RelayConfig;
use chatty_server::{AppState, ChattyServer, ServerConfig};
use tokio::net::TcpListener;

/// Creates a test server with default config, returns state and address
#[allow(dead_code)]
pub async fn create_test_server() -> (Arc<AppState>, SocketAddr) {
    create_test_server_with_relay(RelayConfig::default()).await
}

/// Creates a test server with custom relay settings
#[allow(dead_code)]
pub async fn create_test_server_with_relay(relay: RelayConfig) -> (Arc<AppState>, SocketAddr) {
    let state = Arc::new(AppState::with_config(relay.clone()));
    let config = ServerConfig::new("127.0.0.1", 0).with_relay(relay);

    let server = ChattyServer::with_state(config, Arc::clone(&state));
    let addr = spawn_server(server).await;

    (state, addr)
}

/// Spawns server in background task, returns bound address
async fn spawn_server(server: ChattyServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run_with_listener(listener).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    addr
}

/// Poll `check` until it returns true or `timeout` elapses
#[allow(dead_code)]
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Connect as `username` and wait until the relay has registered the session
#[allow(dead_code)]
pub async fn connect_client(
    state: &Arc<AppState>,
    addr: SocketAddr,
    username: &str,
) -> client::TestClient {
    let client = client::TestClient::connect(addr, username).await;
    let registered = eventually(Duration::from_secs(2), || {
        let state = Arc::clone(state);
        let username = username.to_string();
        async move { state.relay.is_registered(&username).await }
    })
    .await;
    assert!(registered, "{} was never registered", username);
    client
}
