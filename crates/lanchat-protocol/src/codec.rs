//! Codec trait and the JSON frame codec.
//!
//! A codec turns a [`ProtocolMessage`] into exactly one frame and back.
//! There is no length prefix and no delimiter: the caller writes each
//! frame with a single write and reads each one with a single bounded
//! read. Two frames that arrive in the same read will not decode. That is
//! a property of the protocol, not of this codec.

use crate::{ProtocolError, ProtocolMessage};

/// Converts protocol messages to frames and back.
///
/// `Send + Sync + 'static` so one codec value can be shared by the server
/// loop and by both client tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message into a single frame.
    ///
    /// # Errors
    /// [`ProtocolError::FrameTooLarge`] if the frame would exceed
    /// [`MAX_FRAME_LEN`](crate::MAX_FRAME_LEN).
    fn encode(&self, message: &ProtocolMessage)
    -> Result<Vec<u8>, ProtocolError>;

    /// Parses a single frame.
    ///
    /// # Errors
    /// See [`ProtocolError`]; variants are checked in declaration order.
    fn decode(&self, data: &[u8]) -> Result<ProtocolMessage, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that writes each message as one UTF-8 JSON object.
///
/// ```rust
/// use lanchat_protocol::{Codec, JsonCodec, ProtocolMessage};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ProtocolMessage::exit("alice")).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), ProtocolMessage::exit("alice"));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(
        &self,
        message: &ProtocolMessage,
    ) -> Result<Vec<u8>, ProtocolError> {
        let bytes = serde_json::to_vec(message).map_err(ProtocolError::Encode)?;
        check_size(bytes.len())?;
        Ok(bytes)
    }

    fn decode(&self, data: &[u8]) -> Result<ProtocolMessage, ProtocolError> {
        check_size(data.len())?;
        let text =
            std::str::from_utf8(data).map_err(|_| ProtocolError::NotBytes)?;
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        if !value.is_object() {
            return Err(ProtocolError::NotAMapping);
        }
        serde_json::from_value(value).map_err(ProtocolError::Unrecognized)
    }
}

fn check_size(size: usize) -> Result<(), ProtocolError> {
    if size > crate::MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            size,
            limit: crate::MAX_FRAME_LEN,
        });
    }
    Ok(())
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ChatMessage, MAX_FRAME_LEN, NAME_IS_OCCUPIED, unix_now};

    fn chat(text: &str) -> ProtocolMessage {
        ProtocolMessage::Chat(ChatMessage {
            from: "alice".into(),
            to: "bob".into(),
            text: text.into(),
            time: 1_700_000_000.25,
        })
    }

    #[test]
    fn test_every_variant_survives_encode_decode() {
        let codec = JsonCodec;
        let messages = [
            ProtocolMessage::Presence {
                name: "alice".into(),
                time: 1_700_000_000.5,
            },
            chat("hi"),
            ProtocolMessage::exit("alice"),
            ProtocolMessage::ok(),
            ProtocolMessage::bad_request(NAME_IS_OCCUPIED),
        ];
        for msg in messages {
            let bytes = codec.encode(&msg).unwrap();
            assert_eq!(codec.decode(&bytes).unwrap(), msg);
        }
    }

    #[test]
    fn test_real_timestamps_survive_encode_decode_exactly() {
        let codec = JsonCodec;
        let mut times: Vec<f64> = (0..20_000u32)
            .map(|i| 1_700_000_000.0 + f64::from(i) * 3.7 + f64::from(i % 997) / 997.0)
            .collect();
        times.extend([1_700_072_975.646_846_5, unix_now()]);

        for time in times {
            let chat = ProtocolMessage::Chat(ChatMessage {
                from: "alice".into(),
                to: "bob".into(),
                text: "hi".into(),
                time,
            });
            let presence = ProtocolMessage::Presence {
                name: "alice".into(),
                time,
            };
            for msg in [chat, presence] {
                let bytes = codec.encode(&msg).unwrap();
                assert_eq!(codec.decode(&bytes).unwrap(), msg, "time {time}");
            }
        }

        let fresh = ProtocolMessage::Chat(ChatMessage::new("alice", "bob", "now"));
        assert_eq!(codec.decode(&codec.encode(&fresh).unwrap()).unwrap(), fresh);
    }

    #[test]
    fn test_encode_produces_utf8_json_object() {
        let bytes = JsonCodec.encode(&chat("привет")).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.starts_with('{') && text.ends_with('}'));
        assert!(text.contains("привет"));
    }

    #[test]
    fn test_encode_rejects_oversized_frame() {
        let err = JsonCodec.encode(&chat(&"x".repeat(MAX_FRAME_LEN))).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { limit: 1024, .. }));
    }

    #[test]
    fn test_encode_accepts_frame_at_limit() {
        let overhead = JsonCodec.encode(&chat("")).unwrap().len();
        let msg = chat(&"x".repeat(MAX_FRAME_LEN - overhead));
        assert_eq!(JsonCodec.encode(&msg).unwrap().len(), MAX_FRAME_LEN);
    }

    #[test]
    fn test_decode_checks_size_before_parsing() {
        // Not JSON at all: a size check that ran after parsing would
        // report Malformed instead.
        let data = vec![0xFFu8; MAX_FRAME_LEN + 1];
        let err = JsonCodec.decode(&data).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FrameTooLarge { size: 1025, limit: 1024 }
        ));
    }

    #[test]
    fn test_decode_rejects_non_utf8() {
        let err = JsonCodec.decode(&[0xC3, 0x28]).unwrap_err();
        assert!(matches!(err, ProtocolError::NotBytes));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let err = JsonCodec.decode(b"{\"action\":").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_non_object_top_level() {
        let inputs: [&[u8]; 4] = [b"[1,2,3]", b"\"presence\"", b"42", b"null"];
        for data in inputs {
            let err = JsonCodec.decode(data).unwrap_err();
            assert!(matches!(err, ProtocolError::NotAMapping));
        }
    }

    #[test]
    fn test_decode_unknown_shape_is_validation_fault() {
        let err = JsonCodec.decode(br#"{"hello":"world"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Unrecognized(_)));
        assert!(err.is_validation_fault());
    }

    #[test]
    fn test_decode_missing_field_is_validation_fault() {
        let err = JsonCodec
            .decode(br#"{"action":"message","from":"alice","to":"bob"}"#)
            .unwrap_err();
        assert!(err.is_validation_fault());
    }

    #[test]
    fn test_two_frames_in_one_read_do_not_decode() {
        let mut data = JsonCodec.encode(&ProtocolMessage::ok()).unwrap();
        data.extend(JsonCodec.encode(&ProtocolMessage::ok()).unwrap());
        let err = JsonCodec.decode(&data).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }
}
