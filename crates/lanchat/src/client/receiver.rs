use lanchat_protocol::{ChatMessage, Codec, JsonCodec, ProtocolError, ProtocolMessage};
use lanchat_transport::FrameReader;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

use crate::LanchatError;

/// Reads frames from the server and forwards chat messages addressed to
/// this session.
pub struct Receiver<R> {
    reader: FrameReader<R>,
    name: String,
    inbox: mpsc::UnboundedSender<ChatMessage>,
    codec: JsonCodec,
}

impl<R> Receiver<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Forwards chats addressed to `name` into `inbox`.
    pub fn new(
        reader: FrameReader<R>,
        name: String,
        inbox: mpsc::UnboundedSender<ChatMessage>,
    ) -> Self {
        Self {
            reader,
            name,
            inbox,
            codec: JsonCodec,
        }
    }

    /// Receives until the connection fails.
    ///
    /// Returns `Ok(())` only if the inbox has been closed. A closed
    /// connection is [`LanchatError::ServerClosed`], and a frame that is not
    /// JSON at all ends the session too.
    pub async fn run(mut self) -> Result<(), LanchatError> {
        loop {
            let frame = self
                .reader
                .recv()
                .await?
                .ok_or(LanchatError::ServerClosed)?;

            match self.codec.decode(&frame) {
                Ok(ProtocolMessage::Chat(chat)) if chat.to == self.name => {
                    tracing::debug!(from = %chat.from, "message received");
                    if self.inbox.send(chat).is_err() {
                        return Ok(());
                    }
                }
                Ok(ProtocolMessage::Response { code, error }) => {
                    tracing::warn!(code, error = error.as_deref().unwrap_or(""), "server replied");
                }
                Ok(other) => {
                    tracing::warn!(kind = other.kind(), "unexpected frame discarded");
                }
                Err(e @ ProtocolError::Malformed(_)) => return Err(e.into()),
                Err(e) => tracing::warn!(error = %e, "invalid frame discarded"),
            }
        }
    }
}
