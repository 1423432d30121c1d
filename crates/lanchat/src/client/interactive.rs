use lanchat_protocol::{ChatMessage, Codec, JsonCodec, ProtocolError, ProtocolMessage};
use lanchat_transport::FrameWriter;
use tokio::io::{AsyncBufRead, AsyncWrite};

use super::{prompt, read_line};
use crate::LanchatError;

/// Command reference shown at start-up and after unknown input.
pub const HELP: &str = "\
Commands:
  message  send a message (you will be asked for the recipient and text)
  help     show this list
  exit     leave the chat
";

enum Command {
    Message,
    Help,
    Exit,
    Unknown,
}

impl Command {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "message" => Self::Message,
            "help" => Self::Help,
            "exit" => Self::Exit,
            _ => Self::Unknown,
        }
    }
}

/// The foreground activity: reads commands and sends frames.
pub struct Interactive<W> {
    writer: FrameWriter<W>,
    name: String,
    codec: JsonCodec,
}

impl<W> Interactive<W>
where
    W: AsyncWrite + Unpin,
{
    /// Sends frames as `name` through `writer`.
    pub fn new(writer: FrameWriter<W>, name: String) -> Self {
        Self {
            writer,
            name,
            codec: JsonCodec,
        }
    }

    /// Runs the command loop until `exit` or end of input, then sends
    /// `Exit` and closes the write direction.
    pub async fn run<I, O>(mut self, mut input: I, mut output: O) -> Result<(), LanchatError>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        prompt(&mut output, HELP).await?;
        loop {
            prompt(&mut output, "Command: ").await?;
            let Some(line) = read_line(&mut input).await? else {
                break;
            };
            match Command::parse(&line) {
                Command::Message => {
                    if !self.compose(&mut input, &mut output).await? {
                        break;
                    }
                }
                Command::Help | Command::Unknown => prompt(&mut output, HELP).await?,
                Command::Exit => break,
            }
        }
        self.exit(&mut output).await
    }

    /// Asks for a recipient and text, then sends the message. Returns
    /// `false` if input ended part way through.
    async fn compose<I, O>(&mut self, input: &mut I, output: &mut O) -> Result<bool, LanchatError>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        prompt(output, "To: ").await?;
        let Some(to) = read_line(input).await? else {
            return Ok(false);
        };
        let to = to.trim();
        if to.is_empty() {
            prompt(output, "Recipient must not be empty.\n").await?;
            return Ok(true);
        }

        prompt(output, "Text: ").await?;
        let Some(text) = read_line(input).await? else {
            return Ok(false);
        };

        let chat = ChatMessage::new(self.name.as_str(), to, text);
        let frame = match self.codec.encode(&ProtocolMessage::Chat(chat)) {
            Ok(frame) => frame,
            Err(ProtocolError::FrameTooLarge { .. }) => {
                prompt(output, "Message is too long, not sent.\n").await?;
                return Ok(true);
            }
            Err(e) => return Err(e.into()),
        };
        self.writer.send(&frame).await?;
        tracing::debug!(to, "message sent");
        Ok(true)
    }

    async fn exit<O>(mut self, output: &mut O) -> Result<(), LanchatError>
    where
        O: AsyncWrite + Unpin,
    {
        let frame = self.codec.encode(&ProtocolMessage::exit(self.name.as_str()))?;
        self.writer.send(&frame).await?;
        prompt(output, "Leaving the chat.\n").await?;
        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!(error = %e, "shutdown after exit failed");
        }
        tracing::info!(name = %self.name, "exit sent");
        Ok(())
    }
}
