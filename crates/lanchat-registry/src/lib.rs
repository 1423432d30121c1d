//! Participant registry and message routing for lanchat.
//!
//! - **Registry** ([`Registry`]): which name belongs to which live
//!   connection, one-to-one.
//! - **Queue** ([`OutboundQueue`]): chat messages accepted this tick.
//! - **Router** ([`route`], [`route_fault`], [`plan_delivery`]): pure
//!   decisions about what an inbound frame does and where a queued
//!   message goes.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server reactor (above)  ← owns sockets, applies decisions
//!     ↕
//! Registry layer (this crate)  ← protocol rules, no I/O
//!     ↕
//! Protocol layer (below)  ← ProtocolMessage, ChatMessage
//! ```

mod error;
mod registry;
mod router;

pub use error::RegistryError;
pub use registry::{OutboundQueue, Registry};
pub use router::{
    Decision, Delivery, RegistryOp, plan_delivery, route, route_fault,
};
