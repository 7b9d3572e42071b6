//! Error types for chatty-core

use thiserror::Error;

/// Errors surfaced to the collaborator layer by [`crate::Relay`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Username already connected: {0}")]
    UsernameTaken(String),
}

/// Errors from the underlying connection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Connection closed")]
    Closed,
}

/// Errors decoding an inbound envelope
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_taken_displays_name() {
        let error = RelayError::UsernameTaken("alice".to_string());
        assert!(error.to_string().contains("alice"));
    }

    #[test]
    fn transport_write_error_displays_cause() {
        let error = TransportError::Write("broken pipe".to_string());
        assert!(error.to_string().contains("broken pipe"));
    }

    #[test]
    fn envelope_error_wraps_serde_error() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = EnvelopeError::from(source);
        assert!(error.to_string().starts_with("Malformed envelope"));
    }
}
