//! # Lanchat
//!
//! A small chat service for a local network.
//!
//! One server multiplexes every client connection on a single task,
//! registers participants by name, and routes text messages between them.
//! Each client runs a background receiver and a foreground command loop
//! over one connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lanchat::prelude::*;
//!
//! # async fn demo() -> Result<(), LanchatError> {
//! let server = ChatServer::builder()
//!     .bind("127.0.0.1:5151".parse().unwrap())
//!     .build()?;
//! server.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await;
//! # Ok(())
//! # }
//! ```

pub mod client;
mod error;
pub mod logging;
pub mod server;

pub use error::LanchatError;

/// Everything needed to run a server or a client session.
pub mod prelude {
    pub use crate::LanchatError;
    pub use crate::client::{ClientConfig, ClientSession, read_name};
    pub use crate::server::{ChatServer, ChatServerBuilder, TickReport};
    pub use lanchat_protocol::{ChatMessage, ProtocolMessage};
    pub use lanchat_transport::Port;
}
