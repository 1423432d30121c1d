//! The router: decides what an inbound frame does to the registry and
//! what, if anything, goes back to the sender.
//!
//! Everything here is a pure function of its inputs. The reactor owns the
//! sockets and applies the decisions, so the protocol rules can be tested
//! without a network.
//!
//! ```text
//! Presence{name}, name free          → Register, reply 200
//! Presence{name}, name taken         → Drop,     reply 400 NAME_IS_OCCUPIED
//! Chat{from = sender's name}         → Enqueue
//! Exit{name = sender's name}         → Unregister (connection closes)
//! anything else                      → Keep,     reply 400 REQUEST_IS_INCORRECT
//! ```

use std::collections::HashSet;

use lanchat_protocol::{
    ChatMessage, NAME_IS_OCCUPIED, ProtocolError, ProtocolMessage,
    REQUEST_IS_INCORRECT,
};
use lanchat_transport::ConnectionId;

use crate::Registry;

/// The registry mutation an inbound frame calls for.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryOp {
    /// Bind `name` to the sending connection.
    Register { name: String },
    /// Append the message to the outbound queue.
    Enqueue(ChatMessage),
    /// Remove `name` and close the sending connection.
    Unregister { name: String },
    /// Close the sending connection (after any reply has been sent),
    /// dropping its registration if it has one.
    Drop,
    /// Leave everything as it is.
    Keep,
}

/// What the reactor should do about one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub op: RegistryOp,
    /// Sent to the originating connection before `op` closes anything.
    pub reply: Option<ProtocolMessage>,
}

impl Decision {
    fn incorrect() -> Self {
        Self {
            op: RegistryOp::Keep,
            reply: Some(ProtocolMessage::bad_request(REQUEST_IS_INCORRECT)),
        }
    }
}

/// Routes one decoded message from `origin`.
pub fn route(
    registry: &Registry,
    origin: ConnectionId,
    message: ProtocolMessage,
) -> Decision {
    match message {
        ProtocolMessage::Presence { name, .. } => {
            if name.is_empty() {
                tracing::debug!(%origin, "presence with empty name");
                return Decision::incorrect();
            }
            if let Some(bound) = registry.name_of(origin) {
                tracing::debug!(%origin, bound, name = %name, "presence on bound connection");
                return Decision::incorrect();
            }
            if registry.contains(&name) {
                tracing::info!(%origin, name = %name, "presence rejected: name occupied");
                return Decision {
                    op: RegistryOp::Drop,
                    reply: Some(ProtocolMessage::bad_request(NAME_IS_OCCUPIED)),
                };
            }
            Decision {
                op: RegistryOp::Register { name },
                reply: Some(ProtocolMessage::ok()),
            }
        }

        ProtocolMessage::Chat(chat) => {
            // The queue only ever holds messages from registered senders.
            if registry.name_of(origin) != Some(chat.from.as_str()) {
                tracing::debug!(%origin, from = %chat.from, "chat from unregistered sender");
                return Decision::incorrect();
            }
            Decision {
                op: RegistryOp::Enqueue(chat),
                reply: None,
            }
        }

        ProtocolMessage::Exit { name } => {
            if registry.lookup(&name) != Some(origin) {
                tracing::debug!(%origin, name = %name, "exit for a name this connection does not hold");
                return Decision::incorrect();
            }
            Decision {
                op: RegistryOp::Unregister { name },
                reply: None,
            }
        }

        ProtocolMessage::Response { .. } => {
            tracing::debug!(%origin, "client sent a response frame");
            Decision::incorrect()
        }
    }
}

/// Routes a frame that failed to decode.
///
/// A well-formed frame with a disallowed shape only earns a `400`. Bytes
/// that are not a frame at all also cost the sender its connection: with
/// no framing to resynchronize on, nothing after them can be trusted.
pub fn route_fault(origin: ConnectionId, error: &ProtocolError) -> Decision {
    if error.is_validation_fault() {
        tracing::debug!(%origin, %error, "invalid request");
        return Decision::incorrect();
    }
    tracing::info!(%origin, %error, "unreadable frame, dropping connection");
    Decision {
        op: RegistryOp::Drop,
        reply: Some(ProtocolMessage::bad_request(REQUEST_IS_INCORRECT)),
    }
}

// ---------------------------------------------------------------------------
// Drain phase
// ---------------------------------------------------------------------------

/// Where a queued message goes this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The destination is registered and writable: send now.
    Deliver(ConnectionId),
    /// The destination is registered but was not writable this tick. The
    /// message is dropped, not requeued, and the destination connection is
    /// treated as lost.
    NotWritable(ConnectionId),
    /// Nobody is registered under the destination name. Logged and
    /// discarded.
    UnknownDestination,
}

/// Decides the fate of one queued message.
pub fn plan_delivery(
    chat: &ChatMessage,
    registry: &Registry,
    writable: &HashSet<ConnectionId>,
) -> Delivery {
    match registry.lookup(&chat.to) {
        Some(conn) if writable.contains(&conn) => Delivery::Deliver(conn),
        Some(conn) => Delivery::NotWritable(conn),
        None => Delivery::UnknownDestination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanchat_protocol::{Codec, JsonCodec, unix_now};

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn presence(name: &str) -> ProtocolMessage {
        ProtocolMessage::Presence {
            name: name.into(),
            time: unix_now(),
        }
    }

    fn chat(from: &str, to: &str) -> ChatMessage {
        ChatMessage::new(from, to, "hi")
    }

    fn registry_with(names: &[(&str, u64)]) -> Registry {
        let mut reg = Registry::new();
        for (name, id) in names {
            reg.register(name, conn(*id)).unwrap();
        }
        reg
    }

    #[test]
    fn test_presence_free_name_registers_with_200() {
        let reg = Registry::new();
        let d = route(&reg, conn(1), presence("alice"));
        assert_eq!(d.op, RegistryOp::Register { name: "alice".into() });
        assert_eq!(d.reply, Some(ProtocolMessage::ok()));
    }

    #[test]
    fn test_presence_taken_name_drops_with_occupied() {
        let reg = registry_with(&[("alice", 1)]);
        let d = route(&reg, conn(2), presence("alice"));
        assert_eq!(d.op, RegistryOp::Drop);
        assert_eq!(d.reply, Some(ProtocolMessage::bad_request(NAME_IS_OCCUPIED)));
    }

    #[test]
    fn test_presence_on_bound_connection_is_incorrect() {
        let reg = registry_with(&[("alice", 1)]);
        let d = route(&reg, conn(1), presence("carol"));
        assert_eq!(d, Decision::incorrect());
    }

    #[test]
    fn test_presence_empty_name_is_incorrect() {
        let d = route(&Registry::new(), conn(1), presence(""));
        assert_eq!(d, Decision::incorrect());
    }

    #[test]
    fn test_chat_from_sender_is_enqueued_regardless_of_destination() {
        let reg = registry_with(&[("alice", 1)]);
        let msg = chat("alice", "nobody");
        let d = route(&reg, conn(1), ProtocolMessage::Chat(msg.clone()));
        assert_eq!(d.op, RegistryOp::Enqueue(msg));
        assert_eq!(d.reply, None);
    }

    #[test]
    fn test_chat_before_presence_is_incorrect() {
        let d = route(&Registry::new(), conn(1), chat("alice", "bob").into());
        assert_eq!(d, Decision::incorrect());
    }

    #[test]
    fn test_chat_with_spoofed_sender_is_incorrect() {
        let reg = registry_with(&[("alice", 1), ("bob", 2)]);
        let d = route(&reg, conn(1), chat("bob", "alice").into());
        assert_eq!(d, Decision::incorrect());
    }

    #[test]
    fn test_exit_own_name_unregisters() {
        let reg = registry_with(&[("alice", 1)]);
        let d = route(&reg, conn(1), ProtocolMessage::exit("alice"));
        assert_eq!(d.op, RegistryOp::Unregister { name: "alice".into() });
        assert_eq!(d.reply, None);
    }

    #[test]
    fn test_exit_for_other_connection_is_incorrect() {
        let reg = registry_with(&[("alice", 1), ("bob", 2)]);
        let d = route(&reg, conn(2), ProtocolMessage::exit("alice"));
        assert_eq!(d, Decision::incorrect());
    }

    #[test]
    fn test_response_from_client_is_incorrect() {
        let d = route(&Registry::new(), conn(1), ProtocolMessage::ok());
        assert_eq!(d.op, RegistryOp::Keep);
        assert_eq!(
            d.reply,
            Some(ProtocolMessage::bad_request(REQUEST_IS_INCORRECT))
        );
    }

    #[test]
    fn test_fault_unrecognized_shape_keeps_connection() {
        let err = JsonCodec.decode(br#"{"action":"dance"}"#).unwrap_err();
        let d = route_fault(conn(1), &err);
        assert_eq!(d, Decision::incorrect());
    }

    #[test]
    fn test_fault_framing_errors_drop_connection() {
        for err in [
            ProtocolError::NotBytes,
            ProtocolError::NotAMapping,
            ProtocolError::FrameTooLarge { size: 2000, limit: 1024 },
        ] {
            let d = route_fault(conn(1), &err);
            assert_eq!(d.op, RegistryOp::Drop);
            assert!(d.reply.is_some());
        }
    }

    #[test]
    fn test_plan_delivery_to_writable_destination() {
        let reg = registry_with(&[("alice", 1), ("bob", 2)]);
        let writable = HashSet::from([conn(1), conn(2)]);
        assert_eq!(
            plan_delivery(&chat("alice", "bob"), &reg, &writable),
            Delivery::Deliver(conn(2))
        );
    }

    #[test]
    fn test_plan_delivery_to_unwritable_destination_is_dropped() {
        let reg = registry_with(&[("alice", 1), ("bob", 2)]);
        let writable = HashSet::from([conn(1)]);
        assert_eq!(
            plan_delivery(&chat("alice", "bob"), &reg, &writable),
            Delivery::NotWritable(conn(2))
        );
    }

    #[test]
    fn test_plan_delivery_to_unknown_destination() {
        let reg = registry_with(&[("alice", 1)]);
        let writable = HashSet::from([conn(1)]);
        assert_eq!(
            plan_delivery(&chat("alice", "ghost"), &reg, &writable),
            Delivery::UnknownDestination
        );
    }

    #[test]
    fn test_registry_uniqueness_scenario() {
        // Two Presence{alice} from distinct connections: the second is
        // refused and the first stays reachable.
        let mut reg = Registry::new();
        let first = route(&reg, conn(1), presence("alice"));
        if let RegistryOp::Register { name } = first.op {
            reg.register(&name, conn(1)).unwrap();
        }
        let second = route(&reg, conn(2), presence("alice"));
        assert_eq!(second.reply, Some(ProtocolMessage::bad_request(NAME_IS_OCCUPIED)));
        assert_eq!(reg.lookup("alice"), Some(conn(1)));

        let writable = HashSet::from([conn(1)]);
        assert_eq!(
            plan_delivery(&chat("bob", "alice"), &reg, &writable),
            Delivery::Deliver(conn(1))
        );
    }
}
