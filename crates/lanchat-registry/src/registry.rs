//! The registry: which participant name belongs to which live connection.
//!
//! # Concurrency note
//!
//! `Registry` is a plain pair of `HashMap`s with no locking. It is owned
//! by the server reactor and only ever touched from that single task.

use std::collections::{HashMap, VecDeque};

use lanchat_protocol::ChatMessage;
use lanchat_transport::ConnectionId;

use crate::RegistryError;

/// Maps participant names to connections, one-to-one.
///
/// ```text
///   register(name, conn)          unregister(name, conn)
///          │                        remove_connection(conn)
///          ▼                               │
///   names: name → conn   ◄── kept in sync ──►   bound: conn → name
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    /// Forward index used for routing.
    names: HashMap<String, ConnectionId>,

    /// Reverse index so a dropped connection can be unregistered without
    /// scanning every name.
    bound: HashMap<ConnectionId, String>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` for `conn`.
    ///
    /// # Errors
    /// - [`RegistryError::NameOccupied`] if the name is taken.
    /// - [`RegistryError::AlreadyBound`] if `conn` already has a name.
    pub fn register(
        &mut self,
        name: &str,
        conn: ConnectionId,
    ) -> Result<(), RegistryError> {
        if self.names.contains_key(name) {
            return Err(RegistryError::NameOccupied(name.to_string()));
        }
        if let Some(existing) = self.bound.get(&conn) {
            return Err(RegistryError::AlreadyBound {
                conn,
                name: existing.clone(),
            });
        }
        self.names.insert(name.to_string(), conn);
        self.bound.insert(conn, name.to_string());
        tracing::info!(%conn, name, "participant registered");
        Ok(())
    }

    /// Removes `name`, but only if it is registered to `conn`.
    pub fn unregister(
        &mut self,
        name: &str,
        conn: ConnectionId,
    ) -> Result<(), RegistryError> {
        if self.names.get(name) != Some(&conn) {
            return Err(RegistryError::NotBound {
                conn,
                name: name.to_string(),
            });
        }
        self.names.remove(name);
        self.bound.remove(&conn);
        tracing::info!(%conn, name, "participant unregistered");
        Ok(())
    }

    /// Removes whatever name `conn` holds. Returns the name, if any.
    pub fn remove_connection(&mut self, conn: ConnectionId) -> Option<String> {
        let name = self.bound.remove(&conn)?;
        self.names.remove(&name);
        tracing::info!(%conn, name = %name, "participant unregistered");
        Some(name)
    }

    /// The connection registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<ConnectionId> {
        self.names.get(name).copied()
    }

    /// The name `conn` is registered under.
    pub fn name_of(&self, conn: ConnectionId) -> Option<&str> {
        self.bound.get(&conn).map(String::as_str)
    }

    /// Whether `name` is currently held by some connection.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All registered names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// OutboundQueue
// ---------------------------------------------------------------------------

/// Chat messages accepted during the current tick, waiting for delivery.
///
/// The reactor drains it completely at the end of every tick, so it is
/// empty between ticks.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    pending: VecDeque<ChatMessage>,
}

impl OutboundQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message accepted this tick.
    pub fn push(&mut self, chat: ChatMessage) {
        self.pending.push_back(chat);
    }

    /// Takes every pending message in FIFO order, leaving the queue empty.
    pub fn drain(&mut self) -> impl Iterator<Item = ChatMessage> + '_ {
        self.pending.drain(..)
    }

    /// Number of messages waiting for the drain phase.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
