//! Wire envelope exchanged between clients
//!
//! The relay only decodes envelopes to read `typeMsg` and `receiver`; the
//! bytes it forwards are always the ones the sender wrote.

use serde::{Deserialize, Serialize};

use crate::error::EnvelopeError;

/// Kind of an envelope, carried in the `typeMsg` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    /// Ends the sender's session
    Logout,
    /// Ordinary chat message (`"chat"`, or `"regular"` from older clients)
    Chat,
    /// Any kind the relay does not interpret; forwarded like chat
    Other(String),
}

impl From<String> for MessageKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "logout" => MessageKind::Logout,
            "chat" | "regular" => MessageKind::Chat,
            _ => MessageKind::Other(value),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Logout => "logout".to_string(),
            MessageKind::Chat => "chat".to_string(),
            MessageKind::Other(value) => value,
        }
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Other(String::new())
    }
}

/// A message envelope as sent by clients
///
/// Missing fields decode as empty strings so sparse envelopes still route.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    /// Client-side timestamp, opaque to the relay
    pub time: String,
    /// Message kind
    #[serde(rename = "typeMsg")]
    pub kind: MessageKind,
    /// Claimed sender username
    pub sender: String,
    /// Recipient username used for routing
    pub receiver: String,
    /// Message body
    pub payload: String,
}

impl Envelope {
    /// Build a chat envelope
    pub fn chat(
        time: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            kind: MessageKind::Chat,
            sender: sender.into(),
            receiver: receiver.into(),
            payload: payload.into(),
        }
    }

    /// Build a logout envelope addressed to the relay itself
    pub fn logout(time: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            kind: MessageKind::Logout,
            sender: sender.into(),
            receiver: "System".to_string(),
            payload: String::new(),
        }
    }

    /// Decode an envelope from raw frame bytes
    pub fn decode(raw: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Encode the envelope as JSON text
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_logout(&self) -> bool {
        self.kind == MessageKind::Logout
    }
}
