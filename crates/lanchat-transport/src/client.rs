//! Client-side socket role: connect, then send and receive whole frames.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::{READ_BUFFER_LEN, TransportError};

/// Reads one frame per read call from any async byte source.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a byte source with a buffer sized for one oversized frame.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: vec![0; READ_BUFFER_LEN],
        }
    }

    /// Receives the next frame.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    pub async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let n = self
            .inner
            .read(&mut self.buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf[..n].to_vec()))
    }
}

/// Writes whole frames to any async byte sink.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wraps a byte sink.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Sends one frame and flushes it.
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.inner
            .write_all(frame)
            .await
            .map_err(TransportError::SendFailed)?;
        self.inner.flush().await.map_err(TransportError::SendFailed)
    }

    /// Closes the write direction.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.inner
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }
}

/// The connecting side. Only this type can dial out, and it cannot
/// listen or accept.
pub struct ClientRole {
    peer: SocketAddr,
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl ClientRole {
    /// Connects to a lanchat server at `addr` (`host:port`).
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::ConnectFailed)?;
        let peer = stream.peer_addr().map_err(TransportError::ConnectFailed)?;
        stream
            .set_nodelay(true)
            .map_err(TransportError::ConnectFailed)?;
        tracing::debug!(%peer, "connected to server");
        let (read, write) = stream.into_split();
        Ok(Self {
            peer,
            reader: FrameReader::new(read),
            writer: FrameWriter::new(write),
        })
    }

    /// Returns the server's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Sends one frame.
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.writer.send(frame).await
    }

    /// Receives one frame, `Ok(None)` on clean close.
    pub async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        self.reader.recv().await
    }

    /// Splits the connection so reading and writing can run in separate
    /// tasks. Each half owns exactly one direction of the stream.
    pub fn into_split(
        self,
    ) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}
