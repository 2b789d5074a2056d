//! Anthropic Messages request schema.
//!
//! Reference: <https://docs.claude.com/en/api/messages>

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeMessagesRequest {
    pub model: String,

    pub messages: Vec<ClaudeMessage>,

    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_temperature"
    )]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ClaudeThinkingConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeThinkingConfig {
    Enabled {
        #[serde(default)]
        budget_tokens: u32,
    },
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeMessage {
    pub role: String,

    /// Either a plain string or an array of typed content blocks.
    pub content: Value,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn deserialize_temperature<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map(|value| value.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_request_deserializes() {
        let req: ClaudeMessagesRequest = serde_json::from_value(json!({
            "model": "claude-x",
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        assert_eq!(req.model, "claude-x");
        assert_eq!(req.max_tokens, 1024);
    }

    #[test]
    fn thinking_enabled_carries_budget() {
        let req: ClaudeMessagesRequest = serde_json::from_value(json!({
            "model": "claude-x",
            "max_tokens": 1024,
            "messages": [],
            "thinking": {"type": "enabled", "budget_tokens": 4096}
        }))
        .unwrap();

        match req.thinking.unwrap() {
            ClaudeThinkingConfig::Enabled { budget_tokens } => assert_eq!(budget_tokens, 4096),
            ClaudeThinkingConfig::Disabled => panic!("expected enabled"),
        }
    }

    #[test]
    fn content_blocks_array_preserved_as_raw_value() {
        let req: ClaudeMessagesRequest = serde_json::from_value(json!({
            "model": "claude-x",
            "max_tokens": 1024,
            "messages": [{
                "role": "user",
                "content": [{"type": "text", "text": "hi"}]
            }]
        }))
        .unwrap();

        assert!(req.messages[0].content.is_array());
    }
}
