//! Wire protocol for lanchat.
//!
//! - **Types** ([`ProtocolMessage`], [`ChatMessage`]): what travels on
//!   the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how a message becomes
//!   one frame and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while framing.
//!
//! ```text
//! Transport (bytes) → Protocol (ProtocolMessage) → Registry/Router
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use lanchat_transport::MAX_FRAME_LEN;
pub use types::{
    ChatMessage, NAME_IS_OCCUPIED, ProtocolMessage, REQUEST_IS_INCORRECT,
    STATUS_BAD_REQUEST, STATUS_OK, unix_now,
};
