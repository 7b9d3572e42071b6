//! HTTP and WebSocket connection handling for the chatty client

use anyhow::{Context, Result};
use chatty_core::Envelope;
use chatty_server::FriendsResponse;
use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use reqwest::redirect::Policy;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Result of the pre-connect admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsernameStatus {
    Available,
    Taken,
}

/// Client for one chat session against a relay
pub struct ChattyClient {
    username: String,
    server_url: String,
    http: reqwest::Client,
    /// Sender for outgoing envelopes
    tx: mpsc::Sender<Envelope>,
    /// Receiver for incoming envelopes
    rx: mpsc::Receiver<Envelope>,
    outgoing: JoinHandle<()>,
}

impl ChattyClient {
    /// Ask the relay whether `username` is free
    pub async fn check_username(server_url: &str, username: &str) -> Result<UsernameStatus> {
        let url = format!(
            "{}/user-validation?username={}",
            base_url(server_url),
            urlencoding::encode(username)
        );
        let response = http_client()?
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", server_url))?;

        match response.status() {
            StatusCode::OK => Ok(UsernameStatus::Available),
            StatusCode::FOUND => Ok(UsernameStatus::Taken),
            status => {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("Username check failed ({}): {}", status, body)
            }
        }
    }

    /// Open the relay WebSocket as `username`
    pub async fn connect(server_url: &str, username: &str) -> Result<Self> {
        let url = websocket_url(server_url, username)?;
        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        let (ws_sender, ws_receiver) = ws_stream.split();

        let (outgoing_tx, outgoing_rx) = mpsc::channel::<Envelope>(32);
        let (incoming_tx, incoming_rx) = mpsc::channel::<Envelope>(32);

        let outgoing = tokio::spawn(Self::outgoing_task(outgoing_rx, ws_sender));
        tokio::spawn(Self::incoming_task(ws_receiver, incoming_tx));

        Ok(Self {
            username: username.to_string(),
            server_url: base_url(server_url).to_string(),
            http: http_client()?,
            tx: outgoing_tx,
            rx: incoming_rx,
            outgoing,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Send an envelope to the relay
    pub async fn send(&self, envelope: Envelope) -> Result<()> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| anyhow::anyhow!("Connection to relay is closed"))
    }

    /// Send a chat message stamped with `time`
    pub async fn send_chat(&self, time: &str, receiver: &str, payload: &str) -> Result<()> {
        self.send(Envelope::chat(time, &self.username, receiver, payload))
            .await
    }

    /// Receive the next envelope
    ///
    /// Returns None if the connection is closed
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Users online besides this one
    pub async fn friends(&self) -> Result<Vec<String>> {
        let url = format!(
            "{}/existing-friends?username={}",
            self.server_url,
            urlencoding::encode(&self.username)
        );
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Friend list unavailable ({})", response.status());
        }
        let body: FriendsResponse = response.json().await?;
        Ok(body.friends)
    }

    /// Send a logout envelope and wait for the socket to close
    pub async fn logout(self, time: &str) -> Result<()> {
        let Self {
            username,
            tx,
            outgoing,
            ..
        } = self;

        if tx.send(Envelope::logout(time, username)).await.is_err() {
            debug!("Connection already closed before logout");
        }
        drop(tx);
        outgoing.await.context("Outgoing task failed")?;
        Ok(())
    }

    /// Forward queued envelopes to the WebSocket, closing it once the queue ends
    async fn outgoing_task<S>(mut rx: mpsc::Receiver<Envelope>, mut ws_sender: S)
    where
        S: SinkExt<Message> + Unpin,
        S::Error: std::fmt::Debug,
    {
        while let Some(envelope) = rx.recv().await {
            match envelope.encode() {
                Ok(json) => {
                    debug!("Sending: {}", json);
                    if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
                        warn!("Failed to send WebSocket message: {:?}", e);
                        return;
                    }
                }
                Err(e) => {
                    warn!("Failed to serialize envelope: {}", e);
                }
            }
        }

        if let Err(e) = ws_sender.close().await {
            debug!("WebSocket close failed: {:?}", e);
        }
    }

    /// Decode incoming frames into envelopes
    async fn incoming_task<S>(mut ws_receiver: S, tx: mpsc::Sender<Envelope>)
    where
        S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        while let Some(result) = ws_receiver.next().await {
            let raw = match result {
                Ok(Message::Text(text)) => text.as_bytes().to_vec(),
                Ok(Message::Binary(bytes)) => bytes.to_vec(),
                Ok(Message::Close(_)) => {
                    debug!("Relay closed the connection");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
            };

            match Envelope::decode(&raw) {
                Ok(envelope) => {
                    if tx.send(envelope).await.is_err() {
                        debug!("Receiver dropped, stopping incoming task");
                        break;
                    }
                }
                Err(e) => warn!("Ignoring malformed message: {}", e),
            }
        }
    }
}

fn http_client() -> Result<reqwest::Client> {
    // 302 from /user-validation means "taken", not a redirect to follow
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .context("Failed to build HTTP client")
}

fn base_url(server_url: &str) -> &str {
    server_url.trim_end_matches('/')
}

/// Map the relay's HTTP base URL to its WebSocket endpoint
fn websocket_url(server_url: &str, username: &str) -> Result<String> {
    let base = base_url(server_url);
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        anyhow::bail!("Unsupported server URL: {}", server_url);
    };

    Ok(format!(
        "{}/registered-user?username={}",
        ws_base,
        urlencoding::encode(username)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatty_server::{AppState, ChattyServer, ServerConfig};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn spawn_server() -> (Arc<AppState>, String) {
        let state = Arc::new(AppState::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server =
            ChattyServer::with_state(ServerConfig::new("127.0.0.1", 0), Arc::clone(&state));
        tokio::spawn(async move {
            let _ = server.run_with_listener(listener).await;
        });

        (state, format!("http://{}", addr))
    }

    async fn wait_registered(state: &AppState, username: &str) {
        for _ in 0..200 {
            if state.relay.is_registered(username).await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} was never registered", username);
    }

    #[test]
    fn test_websocket_url_from_http() {
        let url = websocket_url("http://localhost:8080/", "alice").unwrap();
        assert_eq!(url, "ws://localhost:8080/registered-user?username=alice");
    }

    #[test]
    fn test_websocket_url_from_https_encodes_username() {
        let url = websocket_url("https://chat.example.com", "ann marie").unwrap();
        assert_eq!(
            url,
            "wss://chat.example.com/registered-user?username=ann%20marie"
        );
    }

    #[test]
    fn test_websocket_url_keeps_ws_scheme() {
        let url = websocket_url("ws://127.0.0.1:9000", "bob").unwrap();
        assert_eq!(url, "ws://127.0.0.1:9000/registered-user?username=bob");
    }

    #[test]
    fn test_websocket_url_rejects_unknown_scheme() {
        assert!(websocket_url("ftp://example.com", "bob").is_err());
    }

    #[tokio::test]
    async fn test_check_username_available_then_taken() {
        let (state, url) = spawn_server().await;

        let status = ChattyClient::check_username(&url, "alice").await.unwrap();
        assert_eq!(status, UsernameStatus::Available);

        let _alice = ChattyClient::connect(&url, "alice").await.unwrap();
        wait_registered(&state, "alice").await;

        let status = ChattyClient::check_username(&url, "alice").await.unwrap();
        assert_eq!(status, UsernameStatus::Taken);
    }

    #[tokio::test]
    async fn test_chat_and_friends_round_trip() {
        let (state, url) = spawn_server().await;

        let alice = ChattyClient::connect(&url, "alice").await.unwrap();
        let mut bob = ChattyClient::connect(&url, "bob").await.unwrap();
        wait_registered(&state, "alice").await;
        wait_registered(&state, "bob").await;

        assert_eq!(alice.friends().await.unwrap(), vec!["bob"]);

        alice.send_chat("09:15", "bob", "hello").await.unwrap();
        let received = tokio::time::timeout(Duration::from_secs(2), bob.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(received.sender, "alice");
        assert_eq!(received.payload, "hello");
        assert_eq!(received.time, "09:15");
    }

    #[tokio::test]
    async fn test_logout_frees_username() {
        let (state, url) = spawn_server().await;

        let alice = ChattyClient::connect(&url, "alice").await.unwrap();
        wait_registered(&state, "alice").await;

        alice.logout("10:00").await.unwrap();

        for _ in 0..200 {
            if !state.relay.is_registered("alice").await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("alice still registered after logout");
    }
}
