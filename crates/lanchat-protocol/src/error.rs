//! Error types for the protocol layer.
//!
//! Variants are ordered the way the decoder checks them. Everything up to
//! and including [`ProtocolError::NotAMapping`] means the bytes on the
//! wire could not be understood as a frame at all. Only
//! [`ProtocolError::Unrecognized`] describes a well-formed frame whose
//! shape the protocol does not allow.

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is larger than the protocol allows. Raised before any
    /// parsing is attempted on decode, and after serialization on encode.
    #[error("frame of {size} bytes exceeds the {limit}-byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    /// The payload is not a UTF-8 text byte string.
    #[error("payload is not a UTF-8 byte string")]
    NotBytes,

    /// The payload is not valid JSON.
    #[cfg(feature = "json")]
    #[error("malformed JSON: {0}")]
    Malformed(serde_json::Error),

    /// The payload is valid JSON but the top level is not an object.
    #[error("top-level JSON value is not an object")]
    NotAMapping,

    /// A JSON object that matches none of the protocol's message shapes.
    #[cfg(feature = "json")]
    #[error("unrecognized message shape: {0}")]
    Unrecognized(serde_json::Error),

    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),
}

impl ProtocolError {
    /// `true` for a well-formed frame with a disallowed shape. The peer
    /// deserves a `400` reply but the stream itself is still usable.
    pub fn is_validation_fault(&self) -> bool {
        #[cfg(feature = "json")]
        if let Self::Unrecognized(_) = self {
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_errors_are_not_validation_faults() {
        assert!(!ProtocolError::NotBytes.is_validation_fault());
        assert!(!ProtocolError::NotAMapping.is_validation_fault());
        assert!(
            !ProtocolError::FrameTooLarge { size: 2000, limit: 1024 }
                .is_validation_fault()
        );
    }

    #[test]
    fn test_frame_too_large_display() {
        let err = ProtocolError::FrameTooLarge { size: 2000, limit: 1024 };
        assert_eq!(
            err.to_string(),
            "frame of 2000 bytes exceeds the 1024-byte limit"
        );
    }
}
