//! Message types that travel on the wire.
//!
//! [`ProtocolMessage`] is the tagged union the rest of the system works
//! with. Its JSON shape is not derived directly from the enum: it goes
//! through a private `WireFrame` so that the field names match what
//! existing lanchat peers already send:
//!
//! ```text
//! {"action":"presence","time":1.5,"user":{"account_name":"alice"}}
//! {"action":"message","from":"alice","to":"bob","time":1.5,"message_text":"hi"}
//! {"action":"exit","account_name":"alice"}
//! {"response":200}
//! {"response":400,"error":"Name is already taken."}
//! ```

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Status code for an accepted request.
pub const STATUS_OK: u16 = 200;

/// Status code for a rejected request.
pub const STATUS_BAD_REQUEST: u16 = 400;

/// Reason sent when a `Presence` names a participant that is already
/// registered.
pub const NAME_IS_OCCUPIED: &str = "Name is already taken.";

/// Reason sent for any frame the server will not act on.
pub const REQUEST_IS_INCORRECT: &str = "Request is incorrect.";

/// Seconds since the Unix epoch, as carried in the `time` fields.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

/// A text message from one participant to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub to: String,
    #[serde(rename = "message_text")]
    pub text: String,
    pub time: f64,
}

impl ChatMessage {
    /// Builds a chat message stamped with the current time.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            text: text.into(),
            time: unix_now(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProtocolMessage
// ---------------------------------------------------------------------------

/// Exactly one of these is carried by each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireFrame", into = "WireFrame")]
pub enum ProtocolMessage {
    /// Client → Server: "I am `name`." The handshake message.
    Presence { name: String, time: f64 },

    /// Client → Server → Client: a routed text message.
    Chat(ChatMessage),

    /// Client → Server: "`name` is leaving."
    Exit { name: String },

    /// Server → Client: outcome of a request. `error` is only present on
    /// a `400`.
    Response { code: u16, error: Option<String> },
}

impl ProtocolMessage {
    /// A `Presence` stamped with the current time.
    pub fn presence(name: impl Into<String>) -> Self {
        Self::Presence {
            name: name.into(),
            time: unix_now(),
        }
    }

    /// An `Exit` for `name`.
    pub fn exit(name: impl Into<String>) -> Self {
        Self::Exit { name: name.into() }
    }

    /// `Response{200}`.
    pub fn ok() -> Self {
        Self::Response {
            code: STATUS_OK,
            error: None,
        }
    }

    /// A fresh `Response{400, reason}`. Every call builds a new value; no
    /// response is ever shared between replies.
    pub fn bad_request(reason: &str) -> Self {
        Self::Response {
            code: STATUS_BAD_REQUEST,
            error: Some(reason.to_string()),
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Presence { .. } => "presence",
            Self::Chat(_) => "chat",
            Self::Exit { .. } => "exit",
            Self::Response { .. } => "response",
        }
    }
}

impl From<ChatMessage> for ProtocolMessage {
    fn from(chat: ChatMessage) -> Self {
        Self::Chat(chat)
    }
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Presence { name, .. } => write!(f, "presence({name})"),
            Self::Chat(chat) => write!(f, "chat({} -> {})", chat.from, chat.to),
            Self::Exit { name } => write!(f, "exit({name})"),
            Self::Response { code, error: None } => write!(f, "response({code})"),
            Self::Response {
                code,
                error: Some(error),
            } => write!(f, "response({code}: {error})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

/// Requests carry an `action` tag; responses carry a `response` code and
/// no tag, so the outer enum is untagged.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireFrame {
    Action(ActionFrame),
    Response(ResponseFrame),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ActionFrame {
    Presence { time: f64, user: UserFrame },
    Message(ChatMessage),
    Exit { account_name: String },
}

#[derive(Clone, Serialize, Deserialize)]
struct UserFrame {
    account_name: String,
}

#[derive(Clone, Serialize, Deserialize)]
struct ResponseFrame {
    response: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl TryFrom<WireFrame> for ProtocolMessage {
    type Error = String;

    fn try_from(frame: WireFrame) -> Result<Self, Self::Error> {
        Ok(match frame {
            WireFrame::Action(ActionFrame::Presence { time, user }) => {
                Self::Presence {
                    name: user.account_name,
                    time,
                }
            }
            WireFrame::Action(ActionFrame::Message(chat)) => Self::Chat(chat),
            WireFrame::Action(ActionFrame::Exit { account_name }) => {
                Self::Exit { name: account_name }
            }
            WireFrame::Response(ResponseFrame { response, error }) => {
                match (response, &error) {
                    (STATUS_OK, None) | (STATUS_BAD_REQUEST, Some(_)) => {}
                    (STATUS_OK, Some(_)) => {
                        return Err("a 200 response carries no error".into());
                    }
                    (STATUS_BAD_REQUEST, None) => {
                        return Err("a 400 response needs an error".into());
                    }
                    _ => {
                        return Err(format!("unsupported response code {response}"));
                    }
                }
                Self::Response {
                    code: response,
                    error,
                }
            }
        })
    }
}

impl From<ProtocolMessage> for WireFrame {
    fn from(msg: ProtocolMessage) -> Self {
        match msg {
            ProtocolMessage::Presence { name, time } => {
                Self::Action(ActionFrame::Presence {
                    time,
                    user: UserFrame { account_name: name },
                })
            }
            ProtocolMessage::Chat(chat) => Self::Action(ActionFrame::Message(chat)),
            ProtocolMessage::Exit { name } => Self::Action(ActionFrame::Exit {
                account_name: name,
            }),
            ProtocolMessage::Response { code, error } => {
                Self::Response(ResponseFrame {
                    response: code,
                    error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_wire_shape() {
        let msg = ProtocolMessage::Presence {
            name: "alice".into(),
            time: 1.5,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["action"], "presence");
        assert_eq!(json["time"], 1.5);
        assert_eq!(json["user"]["account_name"], "alice");
    }

    #[test]
    fn test_chat_wire_shape() {
        let msg = ProtocolMessage::Chat(ChatMessage {
            from: "alice".into(),
            to: "bob".into(),
            text: "hi".into(),
            time: 2.0,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["action"], "message");
        assert_eq!(json["from"], "alice");
        assert_eq!(json["to"], "bob");
        assert_eq!(json["message_text"], "hi");
    }

    #[test]
    fn test_exit_wire_shape() {
        let json = serde_json::to_value(ProtocolMessage::exit("alice")).unwrap();
        assert_eq!(json, serde_json::json!({"action": "exit", "account_name": "alice"}));
    }

    #[test]
    fn test_ok_response_has_no_error_key() {
        let json = serde_json::to_string(&ProtocolMessage::ok()).unwrap();
        assert_eq!(json, r#"{"response":200}"#);
    }

    #[test]
    fn test_bad_request_carries_reason() {
        let json = serde_json::to_value(ProtocolMessage::bad_request(NAME_IS_OCCUPIED)).unwrap();
        assert_eq!(json["response"], 400);
        assert_eq!(json["error"], NAME_IS_OCCUPIED);
    }

    #[test]
    fn test_bad_request_values_are_independent() {
        let mut first = ProtocolMessage::bad_request(NAME_IS_OCCUPIED);
        let second = ProtocolMessage::bad_request(REQUEST_IS_INCORRECT);
        if let ProtocolMessage::Response { error, .. } = &mut first {
            *error = Some("mutated".into());
        }
        assert_eq!(
            second,
            ProtocolMessage::Response {
                code: 400,
                error: Some(REQUEST_IS_INCORRECT.into())
            }
        );
        assert_eq!(
            ProtocolMessage::bad_request(NAME_IS_OCCUPIED),
            ProtocolMessage::Response {
                code: 400,
                error: Some(NAME_IS_OCCUPIED.into())
            }
        );
    }

    #[test]
    fn test_exit_ignores_time_field() {
        let msg: ProtocolMessage = serde_json::from_str(
            r#"{"action":"exit","time":12.0,"account_name":"alice"}"#,
        )
        .unwrap();
        assert_eq!(msg, ProtocolMessage::exit("alice"));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result: Result<ProtocolMessage, _> =
            serde_json::from_str(r#"{"action":"dance","name":"alice"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_response_code_is_rejected() {
        let result: Result<ProtocolMessage, _> =
            serde_json::from_str(r#"{"response":302}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_field_must_match_response_code() {
        let inputs = [
            r#"{"response":200,"error":"x"}"#,
            r#"{"response":400}"#,
        ];
        for input in inputs {
            let result: Result<ProtocolMessage, _> = serde_json::from_str(input);
            assert!(result.is_err(), "{input} should be rejected");
        }
        let accepted: ProtocolMessage =
            serde_json::from_str(r#"{"response":400,"error":"Request is incorrect."}"#)
                .unwrap();
        assert_eq!(accepted, ProtocolMessage::bad_request(REQUEST_IS_INCORRECT));
    }

    #[test]
    fn test_display() {
        assert_eq!(ProtocolMessage::exit("alice").to_string(), "exit(alice)");
        assert_eq!(ProtocolMessage::ok().to_string(), "response(200)");
        assert_eq!(ProtocolMessage::ok().kind(), "response");
    }

    #[test]
    fn test_chat_new_stamps_time() {
        let chat = ChatMessage::new("alice", "bob", "hi");
        assert!(chat.time > 0.0);
    }
}
