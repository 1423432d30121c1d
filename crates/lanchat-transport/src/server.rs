//! Server-side socket role: listen, accept, and non-blocking frame I/O.

use std::net::{Shutdown, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::io::Interest;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::{ConnectionId, READ_BUFFER_LEN, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// The listening half of the server. Only this type can bind and accept.
pub struct ServerRole {
    listener: TcpListener,
}

impl ServerRole {
    /// Binds a listening socket to `addr` with the given backlog.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn bind(addr: SocketAddr, backlog: u32) -> Result<Self, TransportError> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(TransportError::BindFailed)?;
        socket
            .set_reuseaddr(true)
            .map_err(TransportError::BindFailed)?;
        socket.bind(addr).map_err(TransportError::BindFailed)?;
        let listener =
            socket.listen(backlog).map_err(TransportError::BindFailed)?;
        tracing::info!(%addr, backlog, "server listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits at most `wait` for an incoming connection.
    ///
    /// Returns `Ok(None)` when nothing arrived in time, so the caller's
    /// loop stays responsive.
    pub async fn accept_within(
        &self,
        wait: Duration,
    ) -> Result<Option<ServerConnection>, TransportError> {
        let (stream, peer) =
            match tokio::time::timeout(wait, self.listener.accept()).await {
                Err(_) => return Ok(None),
                Ok(result) => result.map_err(TransportError::AcceptFailed)?,
            };
        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %peer, "accepted TCP connection");
        Ok(Some(ServerConnection { id, peer, stream }))
    }
}

/// Readiness of one connection, sampled without waiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
}

/// Result of a non-blocking receive attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum TryRecv {
    /// One read's worth of bytes: a single frame.
    Frame(Vec<u8>),
    /// Nothing to read right now.
    Pending,
    /// The peer closed its side of the stream.
    Closed,
}

/// One accepted client connection, owned by the server reactor.
///
/// Every operation here is non-blocking. Dropping the value (or calling
/// [`close`](Self::close)) releases the socket.
pub struct ServerConnection {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
}

impl ServerConnection {
    /// Returns the unique identifier for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Samples read/write readiness with zero wait.
    pub fn poll_readiness(&self) -> Readiness {
        let interest = Interest::READABLE | Interest::WRITABLE;
        match self.stream.ready(interest).now_or_never() {
            Some(Ok(ready)) => Readiness {
                readable: ready.is_readable() || ready.is_read_closed(),
                writable: ready.is_writable(),
            },
            // Surface the error through the read path.
            Some(Err(_)) => Readiness {
                readable: true,
                writable: false,
            },
            None => Readiness::default(),
        }
    }

    /// Performs one bounded, non-blocking read.
    pub fn try_recv(&self) -> Result<TryRecv, TransportError> {
        let mut buf = [0u8; READ_BUFFER_LEN];
        match self.stream.try_read(&mut buf) {
            Ok(0) => Ok(TryRecv::Closed),
            Ok(n) => Ok(TryRecv::Frame(buf[..n].to_vec())),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Ok(TryRecv::Pending)
            }
            Err(e) => Err(TransportError::ReceiveFailed(e)),
        }
    }

    /// Writes a whole frame in a single non-blocking write.
    ///
    /// A partial write is reported as a failure: the frame would be
    /// corrupted on the wire and there is no length prefix to recover.
    pub fn try_send(&self, frame: &[u8]) -> Result<(), TransportError> {
        match self.stream.try_write(frame) {
            Ok(n) if n == frame.len() => Ok(()),
            Ok(n) => Err(TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("partial frame write: {n} of {} bytes", frame.len()),
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(TransportError::NotWritable)
            }
            Err(e) => Err(TransportError::SendFailed(e)),
        }
    }

    /// Shuts the socket down in both directions and releases it.
    pub fn close(self) {
        let id = self.id;
        if let Ok(stream) = self.stream.into_std() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        tracing::trace!(%id, "connection closed");
    }
}
