//! Realtime channel wire messages

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keepalive request sent by the client
pub const PING: &str = "ping";
/// Keepalive acknowledgment sent by the server
pub const PONG: &str = "pong";
/// Handshake acknowledgment sent by the server after accepting the socket
pub const CONNECTED: &str = "connected";

/// A tagged `{ "type": ..., ...payload }` record, in either direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ChannelMessage {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    /// The keepalive message
    pub fn ping() -> Self {
        Self::new(PING)
    }

    /// Builder-style payload field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Parse an inbound text frame. The frame must be a JSON object with a string `type`.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(Error::InvalidData("message is not a JSON object".to_string()));
        }
        match value.get("type") {
            Some(Value::String(_)) => Ok(serde_json::from_value(value)?),
            Some(_) => Err(Error::InvalidData("message `type` is not a string".to_string())),
            None => Err(Error::InvalidData("message has no `type`".to_string())),
        }
    }

    /// Serialize for transmission
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Protocol-internal messages are consumed by the connection manager
    pub fn is_internal(&self) -> bool {
        self.kind == PONG || self.kind == CONNECTED
    }

    /// `data` field, present on issue events
    pub fn data(&self) -> Option<&Value> {
        self.payload.get("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_keeps_payload() {
        let msg = ChannelMessage::parse(
            r#"{"type":"issue.created","data":{"id":7,"title":"Fix login"}}"#,
        )
        .unwrap();

        assert_eq!(msg.kind, "issue.created");
        assert_eq!(msg.data(), Some(&json!({"id": 7, "title": "Fix login"})));
        assert!(!msg.is_internal());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ChannelMessage::parse("not json").is_err());
        assert!(ChannelMessage::parse("[1,2]").is_err());
        assert!(ChannelMessage::parse(r#"{"data":{}}"#).is_err());
        assert!(ChannelMessage::parse(r#"{"type":5}"#).is_err());
    }

    #[test]
    fn test_internal_types() {
        assert!(ChannelMessage::parse(r#"{"type":"pong"}"#).unwrap().is_internal());
        let connected = ChannelMessage::parse(
            r#"{"type":"connected","message":"Connected to project 42","user_id":3}"#,
        )
        .unwrap();
        assert!(connected.is_internal());
        assert!(!ChannelMessage::ping().is_internal());
    }

    #[test]
    fn test_ping_wire_format() {
        assert_eq!(ChannelMessage::ping().to_json().unwrap(), r#"{"type":"ping"}"#);

        let typing = ChannelMessage::new("typing").with("issue_id", 12);
        let value: Value = serde_json::from_str(&typing.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "typing", "issue_id": 12}));
    }
}
