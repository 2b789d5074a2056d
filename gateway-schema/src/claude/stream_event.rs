//! Anthropic Messages streaming event schema.
//!
//! Each variant corresponds to one SSE frame: `event: <name>\ndata: <json>\n\n`,
//! where `<name>` is also embedded as the event's own `type` field.

use serde::Serialize;
use serde_json::Value;

use super::messages_response::ClaudeUsage;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClaudeStreamEvent {
    #[serde(rename = "message_start")]
    MessageStart { message: Value },

    #[serde(rename = "content_block_start")]
    ContentBlockStart {
        index: u32,
        content_block: ContentBlockStartPayload,
    },

    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { index: u32, delta: ContentBlockDelta },

    #[serde(rename = "content_block_stop")]
    ContentBlockStop { index: u32 },

    #[serde(rename = "message_delta")]
    MessageDelta { delta: MessageDeltaPayload, usage: ClaudeUsage },

    #[serde(rename = "message_stop")]
    MessageStop,

    #[serde(rename = "error")]
    Error { error: Value },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ContentBlockStartPayload {
    #[serde(rename = "thinking")]
    Thinking {
        thinking: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ContentBlockDelta {
    #[serde(rename = "thinking_delta")]
    Thinking {
        thinking: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    #[serde(rename = "text_delta")]
    Text { text: String },
    #[serde(rename = "input_json_delta")]
    InputJson { partial_json: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDeltaPayload {
    pub stop_reason: String,
}

impl ClaudeStreamEvent {
    /// The SSE `event:` line name, matching this variant's wire `type`.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::MessageStart { .. } => "message_start",
            Self::ContentBlockStart { .. } => "content_block_start",
            Self::ContentBlockDelta { .. } => "content_block_delta",
            Self::ContentBlockStop { .. } => "content_block_stop",
            Self::MessageDelta { .. } => "message_delta",
            Self::MessageStop => "message_stop",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_block_start_thinking_serializes_with_type_tag() {
        let event = ClaudeStreamEvent::ContentBlockStart {
            index: 0,
            content_block: ContentBlockStartPayload::Thinking {
                thinking: String::new(),
                signature: None,
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("content_block_start"));
        assert_eq!(value["content_block"]["type"], json!("thinking"));
    }

    #[test]
    fn event_name_matches_wire_type() {
        let event = ClaudeStreamEvent::MessageStop;
        assert_eq!(event.event_name(), "message_stop");
    }
}
