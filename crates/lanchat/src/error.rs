//! Unified error type for lanchat.

use std::time::Duration;

use lanchat_protocol::ProtocolError;
use lanchat_registry::RegistryError;
use lanchat_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each wrapper variant lets `?` convert sub-crate errors
/// automatically. The remaining variants are the client's fatal session
/// outcomes.
#[derive(Debug, thiserror::Error)]
pub enum LanchatError {
    /// A transport-level error (bind, accept, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (frame too large, not a JSON object, ...).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry invariant was violated.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The server answered the presence handshake with an error code.
    #[error("server rejected the handshake: {code} {reason}")]
    HandshakeRejected { code: u16, reason: String },

    /// The server sent something other than a response to the handshake.
    #[error("unexpected handshake reply: {0}")]
    UnexpectedReply(String),

    /// No handshake reply arrived in time.
    #[error("no handshake reply within {0:?}")]
    HandshakeTimeout(Duration),

    /// The server closed the connection.
    #[error("connection to the server was lost")]
    ServerClosed,

    /// Reading commands or writing prompts failed.
    #[error("terminal I/O failed: {0}")]
    Terminal(#[source] std::io::Error),

    /// The background receiver task panicked or was cancelled.
    #[error("receiver task failed: {0}")]
    ReceiverTask(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let lanchat_err: LanchatError = err.into();
        assert!(matches!(lanchat_err, LanchatError::Transport(_)));
        assert!(lanchat_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::NotAMapping;
        let lanchat_err: LanchatError = err.into();
        assert!(matches!(lanchat_err, LanchatError::Protocol(_)));
    }

    #[test]
    fn test_from_registry_error() {
        let err = RegistryError::NameOccupied("alice".into());
        let lanchat_err: LanchatError = err.into();
        assert!(matches!(lanchat_err, LanchatError::Registry(_)));
    }

    #[test]
    fn test_handshake_rejected_display() {
        let err = LanchatError::HandshakeRejected {
            code: 400,
            reason: "Name is already taken.".into(),
        };
        assert_eq!(
            err.to_string(),
            "server rejected the handshake: 400 Name is already taken."
        );
    }
}
