//! Client session: presence handshake, then a background [`Receiver`]
//! and a foreground [`Interactive`] loop sharing one connection.
//!
//! The connection is split after the handshake. The receiver task owns
//! the read half and the interactive loop owns the write half, so the two
//! never touch the same direction of the stream.

mod interactive;
mod receiver;

pub use interactive::{HELP, Interactive};
pub use receiver::Receiver;

use std::net::SocketAddr;
use std::time::Duration;

use lanchat_protocol::{ChatMessage, Codec, JsonCodec, ProtocolMessage, STATUS_OK};
use lanchat_transport::ClientRole;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::LanchatError;

/// Timing knobs for a client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long to wait for the server's answer to `Presence`.
    pub handshake_timeout: Duration,
    /// Pause after sending `Exit` so the frame leaves before the socket
    /// closes.
    pub exit_grace: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            exit_grace: Duration::from_millis(500),
        }
    }
}

/// A registered participant connected to a lanchat server.
pub struct ClientSession {
    name: String,
    role: ClientRole,
    config: ClientConfig,
}

impl ClientSession {
    /// Connects to `addr` and registers as `name`.
    ///
    /// # Errors
    /// - [`LanchatError::HandshakeRejected`] if the server answers `400`
    ///   (for example because the name is taken).
    /// - [`LanchatError::HandshakeTimeout`] if no answer arrives in time.
    /// - [`LanchatError::ServerClosed`] if the server hangs up first.
    pub async fn connect(
        addr: &str,
        name: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, LanchatError> {
        let name = name.into();
        let mut role = ClientRole::connect(addr).await?;
        let codec = JsonCodec;

        role.send(&codec.encode(&ProtocolMessage::presence(name.as_str()))?)
            .await?;

        let frame = tokio::time::timeout(config.handshake_timeout, role.recv())
            .await
            .map_err(|_| LanchatError::HandshakeTimeout(config.handshake_timeout))??
            .ok_or(LanchatError::ServerClosed)?;

        match codec.decode(&frame)? {
            ProtocolMessage::Response { code, .. } if code == STATUS_OK => {
                tracing::info!(name = %name, server = %role.peer_addr(), "registered");
                Ok(Self { name, role, config })
            }
            ProtocolMessage::Response { code, error } => {
                Err(LanchatError::HandshakeRejected {
                    code,
                    reason: error.unwrap_or_default(),
                })
            }
            other => Err(LanchatError::UnexpectedReply(other.to_string())),
        }
    }

    /// The name this session is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The address of the server this session is connected to.
    pub fn server_addr(&self) -> SocketAddr {
        self.role.peer_addr()
    }

    /// Runs both activities until the user exits or the connection fails.
    ///
    /// Commands are read from `input` and prompts go to `output`. Chat
    /// messages addressed to this session are sent to `inbox`.
    ///
    /// Returns `Ok(())` after `exit` (or end of input). Any fault on the
    /// connection ends the whole session with an error.
    pub async fn run<I, O>(
        self,
        input: I,
        output: O,
        inbox: mpsc::UnboundedSender<ChatMessage>,
    ) -> Result<(), LanchatError>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let grace = self.config.exit_grace;
        let (reader, writer) = self.role.into_split();
        let mut receiver =
            tokio::spawn(Receiver::new(reader, self.name.clone(), inbox).run());
        let interactive = Interactive::new(writer, self.name);

        tokio::select! {
            // Once `Exit` is out the server hangs up, which the receiver
            // sees as a lost connection. The user's exit must win.
            biased;
            outcome = interactive.run(input, output) => {
                if outcome.is_ok() {
                    tokio::time::sleep(grace).await;
                }
                receiver.abort();
                match receiver.await {
                    Ok(Err(e)) => tracing::debug!(error = %e, "receiver stopped"),
                    Err(e) if !e.is_cancelled() => {
                        tracing::warn!(error = %e, "receiver task failed");
                    }
                    _ => {}
                }
                outcome
            }
            joined = &mut receiver => match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(LanchatError::ReceiverTask(e.to_string())),
            },
        }
    }
}

/// Asks for a participant name until a non-empty one is given.
pub async fn read_name<I, O>(
    input: &mut I,
    output: &mut O,
) -> Result<String, LanchatError>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    loop {
        prompt(output, "Enter your name: ").await?;
        let Some(line) = read_line(input).await? else {
            return Err(LanchatError::Terminal(
                std::io::ErrorKind::UnexpectedEof.into(),
            ));
        };
        let name = line.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }
}

/// Writes `text` without a newline and flushes.
pub(crate) async fn prompt<O>(output: &mut O, text: &str) -> Result<(), LanchatError>
where
    O: AsyncWrite + Unpin,
{
    output
        .write_all(text.as_bytes())
        .await
        .map_err(LanchatError::Terminal)?;
    output.flush().await.map_err(LanchatError::Terminal)
}

/// One line without its terminator, or `None` at end of input.
pub(crate) async fn read_line<I>(input: &mut I) -> Result<Option<String>, LanchatError>
where
    I: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = input
        .read_line(&mut line)
        .await
        .map_err(LanchatError::Terminal)?;
    if n == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.handshake_timeout, Duration::from_secs(5));
        assert_eq!(cfg.exit_grace, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_read_name_repeats_until_non_empty() {
        let mut input: &[u8] = b"\n   \n alice \n";
        let mut output = Vec::new();
        let name = read_name(&mut input, &mut output).await.unwrap();
        assert_eq!(name, "alice");
        let prompts = String::from_utf8(output).unwrap();
        assert_eq!(prompts.matches("Enter your name: ").count(), 3);
    }

    #[tokio::test]
    async fn test_read_name_fails_on_end_of_input() {
        let mut input: &[u8] = b"\n";
        let mut output = Vec::new();
        let err = read_name(&mut input, &mut output).await.unwrap_err();
        assert!(matches!(err, LanchatError::Terminal(_)));
    }

    #[tokio::test]
    async fn test_read_line_strips_crlf() {
        let mut input: &[u8] = b"message\r\nrest";
        assert_eq!(read_line(&mut input).await.unwrap().as_deref(), Some("message"));
        assert_eq!(read_line(&mut input).await.unwrap().as_deref(), Some("rest"));
        assert_eq!(read_line(&mut input).await.unwrap(), None);
    }
}
