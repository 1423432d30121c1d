//! Error types for the registry.

use lanchat_transport::ConnectionId;

/// Errors that can occur while mutating the [`Registry`](crate::Registry).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Another connection is already registered under this name.
    #[error("name {0:?} is already registered")]
    NameOccupied(String),

    /// The connection is already registered under a (possibly different)
    /// name. A connection holds at most one name.
    #[error("{conn} is already registered as {name:?}")]
    AlreadyBound { conn: ConnectionId, name: String },

    /// The name is not registered to this connection.
    #[error("{conn} is not registered as {name:?}")]
    NotBound { conn: ConnectionId, name: String },
}
