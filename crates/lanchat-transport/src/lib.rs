//! Transport layer for lanchat.
//!
//! Splits socket capabilities into two role types so that each side of
//! the protocol can only do what it is supposed to do:
//!
//! - [`ServerRole`] owns the listening socket. It binds and accepts, and
//!   hands out [`ServerConnection`]s that are driven without blocking by
//!   the server's reactor.
//! - [`ClientRole`] owns a single outbound stream. It connects, sends, and
//!   receives, and can be split into a [`FrameReader`] and a
//!   [`FrameWriter`] so that reading and writing live in separate tasks.
//!
//! A client can never accept and a server connection can never dial out:
//! the methods simply do not exist on the other type.
//!
//! Frames are not length-prefixed. One read yields one frame, bounded by
//! [`MAX_FRAME_LEN`]. Reads use a buffer one byte larger than the limit so
//! that an oversized frame is visible to the decoder instead of being
//! silently truncated.

mod client;
mod error;
mod server;

pub use client::{ClientRole, FrameReader, FrameWriter};
pub use error::TransportError;
pub use server::{Readiness, ServerConnection, ServerRole, TryRecv};

use std::fmt;
use std::str::FromStr;

/// Largest frame, in bytes, that either side will send or accept.
pub const MAX_FRAME_LEN: usize = 1024;

/// Size of the buffer used for a single bounded read.
pub const READ_BUFFER_LEN: usize = MAX_FRAME_LEN + 1;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// A TCP port that has already been checked against the allowed range.
///
/// There is no way to hold an out-of-range `Port`: the only constructors
/// validate immediately and return [`TransportError::InvalidPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port(u16);

impl Port {
    /// Lowest port a lanchat process may use.
    pub const MIN: u16 = 1024;
    /// Highest port a lanchat process may use.
    pub const MAX: u16 = 65535;
    /// Port used when none is given on the command line.
    pub const DEFAULT: Port = Port(5151);

    /// Validates `value` and wraps it.
    pub fn new(value: i64) -> Result<Self, TransportError> {
        if value < i64::from(Self::MIN) || value > i64::from(Self::MAX) {
            tracing::error!(port = value, "rejected out-of-range port");
            return Err(TransportError::InvalidPort(value.to_string()));
        }
        Ok(Self(value as u16))
    }

    /// Returns the port number.
    pub fn get(self) -> u16 {
        self.0
    }
}

impl Default for Port {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Port {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| TransportError::InvalidPort(s.to_string()))?;
        Self::new(value)
    }
}
