//! WebSocket connection handling

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use chatty_core::{Frame, FrameSink, RelayError, TransportError};
use futures::stream::SplitSink;
use futures::{SinkExt, Stream, StreamExt, future};
use tracing::{info, warn};

use crate::http::UsernameQuery;
use crate::{AppState, ServerError};

/// WebSocket upgrade handler for `/registered-user`
///
/// Rejects missing or taken usernames before upgrading; a connection that
/// loses a registration race after the upgrade is closed by the relay.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ServerError> {
    let username = query.require()?;
    let ws = ws.map_err(|_| ServerError::UpgradeRequired)?;

    if state.relay.presence().is_registered(&username).await {
        info!("Rejected WebSocket connection for {}: already connected", username);
        return Err(ServerError::UsernameTaken(username));
    }

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, username))
        .into_response())
}

/// Hand an upgraded socket to the relay and wait for the session to end
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, username: String) {
    let (sender, receiver) = socket.split();
    info!("WebSocket client connected: {}", username);

    match state
        .relay
        .attach(username.clone(), WsSink(sender), inbound_frames(receiver))
        .await
    {
        Ok(termination) => {
            info!(?termination, "WebSocket client disconnected: {}", username);
        }
        Err(RelayError::UsernameTaken(name)) => {
            warn!("Closed WebSocket for {}: lost registration race", name);
        }
    }
}

/// Map axum messages to relay frames, ending at the peer's close frame
fn inbound_frames<S>(receiver: S) -> impl Stream<Item = Result<Frame, TransportError>> + Send
where
    S: Stream<Item = Result<Message, axum::Error>> + Send,
{
    receiver
        .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
        .map(|msg| {
            msg.map(frame_from_message)
                .map_err(|e| TransportError::Read(e.to_string()))
        })
}

fn frame_from_message(msg: Message) -> Frame {
    match msg {
        Message::Text(text) => Frame::Text(text.to_string()),
        Message::Binary(bytes) => Frame::Binary(bytes.to_vec()),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => Frame::Heartbeat,
    }
}

/// Write half of an axum WebSocket
struct WsSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let msg = match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(bytes) => Message::Binary(bytes.into()),
            Frame::Heartbeat => Message::Ping(Vec::<u8>::new().into()),
        };
        self.0
            .send(msg)
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // The peer may already be gone; a failed close frame is not an error.
        let _ = self.0.send(Message::Close(None)).await;
        self.0
            .close()
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }
}
