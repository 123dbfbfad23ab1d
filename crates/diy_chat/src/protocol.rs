//! Wire frames exchanged with the backend's chat endpoint.
//!
//! Every frame is one UTF-8 JSON text message. Outbound frames carry the
//! user's text plus the project/step it is about; inbound frames are
//! discriminated by `type`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound `type` of an assistant reply.
pub const AI_RESPONSE: &str = "ai_response";

/// Identifiers that tell the backend what the message is about.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

impl MessageContext {
    /// Context for a project-level conversation
    pub fn project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            step_id: None,
        }
    }

    /// Context for a conversation about one step of a project
    pub fn step(project_id: impl Into<String>, step_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            step_id: Some(step_id.into()),
        }
    }
}

/// A chat message sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundMessage {
    pub content: String,
    #[serde(default)]
    pub context: MessageContext,
    /// Lets a reply be matched to the send that caused it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl OutboundMessage {
    /// Create a message with a fresh correlation id
    pub fn new(content: impl Into<String>, context: MessageContext) -> Self {
        Self {
            content: content.into(),
            context,
            correlation_id: Some(uuid::Uuid::new_v4().to_string()),
        }
    }

    /// Convert message to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Create message from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A frame received from the backend.
///
/// Any JSON value decodes into a frame. Fields of an unexpected type are
/// read leniently: a missing or `null` text field is empty, and a
/// non-string one keeps its JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "Value")]
pub struct InboundMessage {
    /// Discriminator, e.g. `ai_response`
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Sent by the backend but not interpreted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    /// Any other fields, kept for handlers that care about them
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl From<Value> for InboundMessage {
    fn from(value: Value) -> Self {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Map::new();
                fields.insert("content".to_string(), other);
                fields
            }
        };

        let kind = take_text(&mut fields, "type").unwrap_or_default();
        let content = take_text(&mut fields, "content").unwrap_or_default();
        let correlation_id = take_text(&mut fields, "correlation_id");
        let timestamp = fields.remove("timestamp").filter(|v| !v.is_null());

        Self {
            kind,
            content,
            correlation_id,
            timestamp,
            extra: fields.into_iter().collect(),
        }
    }
}

fn take_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

impl InboundMessage {
    /// Create a frame of the given type
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: content.into(),
            correlation_id: None,
            timestamp: None,
            extra: HashMap::new(),
        }
    }

    /// Create an assistant reply
    pub fn ai_response(content: impl Into<String>) -> Self {
        Self::new(AI_RESPONSE, content)
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn is_ai_response(&self) -> bool {
        self.kind == AI_RESPONSE
    }

    /// Convert message to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a frame. Fails only when the text is not JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Value>(json).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_outbound_omits_absent_context_ids() {
        let msg = OutboundMessage {
            content: "hello".to_string(),
            context: MessageContext::default(),
            correlation_id: None,
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({ "content": "hello", "context": {} }));
    }

    #[test]
    fn test_outbound_carries_project_and_step() {
        let msg = OutboundMessage::new("which wrench?", MessageContext::step("p1", "step_2"));
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(value["content"], "which wrench?");
        assert_eq!(value["context"]["project_id"], "p1");
        assert_eq!(value["context"]["step_id"], "step_2");
        assert!(value["correlation_id"].is_string());
    }

    #[test]
    fn test_outbound_survives_serialization() {
        let msg = OutboundMessage::new("  spaced\ttext ", MessageContext::project("p9"));
        let parsed = OutboundMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed.content, msg.content);
        assert_eq!(parsed.context, msg.context);
        assert_eq!(parsed.correlation_id, msg.correlation_id);
    }

    #[test]
    fn test_each_outbound_gets_distinct_correlation_id() {
        let a = OutboundMessage::new("a", MessageContext::default());
        let b = OutboundMessage::new("a", MessageContext::default());
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn test_inbound_parses_backend_reply() {
        let raw = r#"{"type":"ai_response","content":"Turn off the water first.","timestamp":"{\"timestamp\": \"now\"}"}"#;
        let msg = InboundMessage::from_json(raw).unwrap();
        assert!(msg.is_ai_response());
        assert_eq!(msg.content, "Turn off the water first.");
        assert!(msg.timestamp.is_some());
        assert!(msg.correlation_id.is_none());
    }

    #[test]
    fn test_inbound_keeps_unknown_fields() {
        let raw = r#"{"type":"tool_update","content":"","tool_id":"tool_3"}"#;
        let msg = InboundMessage::from_json(raw).unwrap();
        assert!(!msg.is_ai_response());
        assert_eq!(msg.extra["tool_id"], "tool_3");
    }

    #[test]
    fn test_inbound_rejects_only_non_json() {
        assert!(InboundMessage::from_json("not json").is_err());
        assert!(InboundMessage::from_json("{\"type\":").is_err());

        let msg = InboundMessage::from_json(r#"{"content":"orphan"}"#).unwrap();
        assert_eq!(msg.kind, "");
        assert_eq!(msg.content, "orphan");
    }

    #[test]
    fn test_inbound_tolerates_non_string_content() {
        let msg = InboundMessage::from_json(r#"{"type":"progress","content":{"pct":40}}"#).unwrap();
        assert_eq!(msg.kind, "progress");
        assert_eq!(serde_json::from_str::<Value>(&msg.content).unwrap(), json!({"pct": 40}));

        let msg = InboundMessage::from_json(r#"{"type":"ai_response","content":null}"#).unwrap();
        assert!(msg.is_ai_response());
        assert_eq!(msg.content, "");

        let msg = InboundMessage::from_json(r#"{"type":"ai_response","correlation_id":7,"timestamp":null}"#).unwrap();
        assert_eq!(msg.correlation_id.as_deref(), Some("7"));
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn test_inbound_serializes_back_to_wire_shape() {
        let msg = InboundMessage::ai_response("hi").with_correlation_id("c1");
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "ai_response", "content": "hi", "correlation_id": "c1"}));
        assert_eq!(InboundMessage::from_json(&msg.to_json().unwrap()).unwrap(), msg);
    }
}
