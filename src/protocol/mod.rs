use serde::{Deserialize, Serialize};

/// Role a client can register under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Broadcaster,
}

/// Control messages exchanged with clients as JSON text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Sent to a client as soon as its connection is accepted
    Connection { status: String },

    /// Client asks to be registered under a role
    Register { role: Role },

    /// Successful registration acknowledgment
    Registration { status: String, role: Role },
}

impl ControlMessage {
    pub fn connected() -> Self {
        ControlMessage::Connection {
            status: "connected".to_string(),
        }
    }

    pub fn registered(role: Role) -> Self {
        ControlMessage::Registration {
            status: "success".to_string(),
            role,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

/// A payload received from or relayed to a client, transport format preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Classification of an inbound payload.
///
/// Only well-formed register requests are consumed by the hub; everything
/// else is an opaque frame, relayed verbatim when the sender is the
/// broadcaster and dropped otherwise. Decode failure is the normal path for
/// the binary frame stream, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A register request; `role` is None when missing or unrecognized
    Register { role: Option<Role> },

    /// Opaque data
    Frame,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    role: Option<serde_json::Value>,
}

/// Classify an inbound payload in a single step.
///
/// Binary payloads, non-JSON text, and JSON whose `type` is anything other
/// than `"register"` all classify as `Frame`. A register request with an
/// unknown or missing role still classifies as `Register` so that it is
/// ignored rather than relayed.
pub fn decode(payload: &Frame) -> Decoded {
    let text = match payload {
        Frame::Text(text) => text,
        Frame::Binary(_) => return Decoded::Frame,
    };

    match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) if envelope.kind == "register" => Decoded::Register {
            role: envelope
                .role
                .and_then(|value| serde_json::from_value(value).ok()),
        },
        _ => Decoded::Frame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_register_roles() {
        let viewer = Frame::Text(r#"{"type":"register","role":"viewer"}"#.to_string());
        assert_eq!(
            decode(&viewer),
            Decoded::Register {
                role: Some(Role::Viewer)
            }
        );

        let broadcaster = Frame::Text(r#"{"type":"register","role":"broadcaster"}"#.to_string());
        assert_eq!(
            decode(&broadcaster),
            Decoded::Register {
                role: Some(Role::Broadcaster)
            }
        );
    }

    #[test]
    fn test_decode_register_bad_role() {
        // Unknown and missing roles still classify as register requests so
        // the hub ignores them instead of relaying them
        let unknown = Frame::Text(r#"{"type":"register","role":"pirate"}"#.to_string());
        assert_eq!(decode(&unknown), Decoded::Register { role: None });

        let missing = Frame::Text(r#"{"type":"register"}"#.to_string());
        assert_eq!(decode(&missing), Decoded::Register { role: None });

        let wrong_type = Frame::Text(r#"{"type":"register","role":42}"#.to_string());
        assert_eq!(decode(&wrong_type), Decoded::Register { role: None });
    }

    #[test]
    fn test_decode_non_register_payloads() {
        // Structured JSON that is not a register request is still a frame
        let other = Frame::Text(r#"{"type":"chunk","data":"..."}"#.to_string());
        assert_eq!(decode(&other), Decoded::Frame);

        let no_type = Frame::Text(r#"{"role":"viewer"}"#.to_string());
        assert_eq!(decode(&no_type), Decoded::Frame);

        let not_json = Frame::Text("not json at all".to_string());
        assert_eq!(decode(&not_json), Decoded::Frame);

        let binary = Frame::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(decode(&binary), Decoded::Frame);
    }

    #[test]
    fn test_connection_ack_wire_shape() {
        let json = ControlMessage::connected().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "connection");
        assert_eq!(value["status"], "connected");
    }

    #[test]
    fn test_registration_ack_wire_shape() {
        let json = ControlMessage::registered(Role::Viewer).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "registration");
        assert_eq!(value["status"], "success");
        assert_eq!(value["role"], "viewer");

        let json = ControlMessage::registered(Role::Broadcaster)
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["role"], "broadcaster");
    }

    #[test]
    fn test_register_round_trip() {
        let msg = ControlMessage::Register {
            role: Role::Broadcaster,
        };
        let json = msg.to_json().unwrap();
        match ControlMessage::from_json(&json).unwrap() {
            ControlMessage::Register { role } => assert_eq!(role, Role::Broadcaster),
            _ => panic!("Wrong message type"),
        }
    }
}
