//! OpenAI Chat Completions request schema.
//!
//! Reference: <https://platform.openai.com/docs/api-reference/chat/create>

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `POST /v1/chat/completions` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiChatRequest {
    pub model: String,

    pub messages: Vec<OpenaiChatMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,

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

    /// Non-standard thinking-budget hint some SDKs send directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,

    /// `{low, medium, high}` mapped onto a thinking-token budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One turn in `messages[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiChatMessage {
    pub role: String,

    /// Either a plain string or an array of content parts; normalized to a
    /// flat string during deserialization since the upstream dialect only
    /// carries text parts for this gateway's purposes.
    #[serde(default, deserialize_with = "deserialize_message_content")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenaiToolCall>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiToolCall {
    pub id: String,

    #[serde(rename = "type", default = "default_function_type")]
    pub kind: String,

    pub function: OpenaiFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiFunctionCall {
    pub name: String,

    /// JSON-encoded arguments, exactly as the wire format expects.
    #[serde(default)]
    pub arguments: String,
}

fn default_function_type() -> String {
    "function".to_string()
}

fn deserialize_temperature<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map(|value| value.clamp(0.0, 2.0)))
}

fn deserialize_message_content<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(raw) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };

    match raw {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Array(parts) => {
            let merged = parts
                .into_iter()
                .filter_map(|part| {
                    part.get("text")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .collect::<Vec<_>>()
                .join("");
            Ok(Some(merged))
        }
        other => Err(serde::de::Error::custom(format!(
            "message content must be a string or an array of parts, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_request_deserializes() {
        let req: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "gpt-x",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        assert_eq!(req.model, "gpt-x");
        assert_eq!(req.messages[0].content.as_deref(), Some("hi"));
    }

    #[test]
    fn array_content_is_merged_into_string() {
        let req: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "gpt-x",
            "messages": [{
                "role": "user",
                "content": [{"type": "text", "text": "hello "}, {"type": "text", "text": "world"}]
            }]
        }))
        .unwrap();

        assert_eq!(req.messages[0].content.as_deref(), Some("hello world"));
    }

    #[test]
    fn temperature_is_clamped() {
        let req: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "gpt-x",
            "messages": [],
            "temperature": 9.0
        }))
        .unwrap();
        assert_eq!(req.temperature, Some(2.0));
    }

    #[test]
    fn unknown_fields_preserved_in_extra() {
        let req: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "gpt-x",
            "messages": [],
            "frequency_penalty": 0.5
        }))
        .unwrap();
        assert_eq!(req.extra.get("frequency_penalty"), Some(&json!(0.5)));
    }

    #[test]
    fn tool_call_message_roundtrips() {
        let input = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "lookup", "arguments": "{\"q\":\"x\"}"}
            }]
        });
        let msg: OpenaiChatMessage = serde_json::from_value(input).unwrap();
        assert!(msg.content.is_none());
        assert_eq!(msg.tool_calls.as_ref().unwrap()[0].id, "call_1");
    }
}
