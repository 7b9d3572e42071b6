//! WebSocket test client for relay testing
//!
//! Provides both low-level WsConnection and high-level TestClient.
//!
//! Note: Some methods may appear unused because they're only used in specific
//! test files and clippy checks each test independently.

use std::net::SocketAddr;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Low-level WebSocket connection
pub struct WsConnection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl WsConnection {
    /// Connect to the relay WebSocket as `username`
    pub async fn connect(addr: SocketAddr, username: &str) -> Self {
        Self::try_connect(addr, username)
            .await
            .expect("Failed to connect")
    }

    /// Connect, returning the handshake error instead of panicking
    pub async fn try_connect(
        addr: SocketAddr,
        username: &str,
    ) -> Result<Self, tokio_tungstenite::tungstenite::Error> {
        let url = format!("ws://{}/registered-user?username={}", addr, username);
        let (ws, _) = tokio_tungstenite::connect_async(&url).await?;
        let (sink, stream) = ws.split();
        Ok(Self { sink, stream })
    }

    /// Send raw text message
    pub async fn send_raw(&mut self, msg: &str) {
        self.sink
            .send(Message::Text(msg.to_string().into()))
            .await
            .unwrap();
    }

    /// Receive raw text message, `None` once the server closed the socket
    pub async fn recv_raw(&mut self) -> Option<String> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(_)) => continue,
                Some(Err(_)) => return None,
            }
        }
    }

    /// Receive with timeout, returns None if timeout
    pub async fn recv_timeout(&mut self, duration: Duration) -> Option<Option<String>> {
        tokio::time::timeout(duration, self.recv_raw()).await.ok()
    }
}

/// High-level test client with helper methods
pub struct TestClient {
    pub username: String,
    pub conn: WsConnection,
}

impl TestClient {
    /// Connect to server as `username`
    #[allow(dead_code)]
    pub async fn connect(addr: SocketAddr, username: &str) -> Self {
        let conn = WsConnection::connect(addr, username).await;
        Self {
            username: username.to_string(),
            conn,
        }
    }

    /// Envelope JSON exactly as the client sends it
    #[allow(dead_code)]
    pub fn envelope(&self, kind: &str, receiver: &str, payload: &str) -> String {
        serde_json::json!({
            "time": "12:00",
            "typeMsg": kind,
            "sender": self.username,
            "receiver": receiver,
            "payload": payload,
        })
        .to_string()
    }

    /// Send a chat envelope, returns the exact text sent
    #[allow(dead_code)]
    pub async fn chat(&mut self, receiver: &str, payload: &str) -> String {
        let text = self.envelope("chat", receiver, payload);
        self.conn.send_raw(&text).await;
        text
    }

    /// Send a logout envelope
    #[allow(dead_code)]
    pub async fn logout(&mut self) {
        let text = self.envelope("logout", "System", "");
        self.conn.send_raw(&text).await;
    }

    /// Receive next text message
    #[allow(dead_code)]
    pub async fn recv(&mut self) -> String {
        self.conn
            .recv_timeout(Duration::from_secs(2))
            .await
            .expect("Timeout waiting for message")
            .expect("WebSocket closed")
    }

    /// Assert no message received within duration
    #[allow(dead_code)]
    pub async fn expect_no_message(&mut self, duration: Duration) {
        assert!(
            self.conn.recv_timeout(duration).await.is_none(),
            "Expected no message but received one"
        );
    }

    /// Assert the server closes this connection within duration
    #[allow(dead_code)]
    pub async fn expect_closed(&mut self, duration: Duration) {
        let start = std::time::Instant::now();
        while start.elapsed() < duration {
            match self.conn.recv_timeout(Duration::from_millis(50)).await {
                Some(None) => return,
                Some(Some(_)) | None => continue,
            }
        }
        panic!("Timeout waiting for server to close the connection");
    }
}
