//! OpenAI Chat Completions response and streaming-chunk schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::chat_request::{OpenaiFunctionCall, OpenaiToolCall};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Non-streaming `chat.completion` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<OpenaiChatChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenaiUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiChatChoice {
    pub index: u32,
    pub message: OpenaiChatChoiceMessage,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenaiChatChoiceMessage {
    pub role: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenaiToolCall>>,
}

/// Streaming `chat.completion.chunk` event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<OpenaiChatChunkChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenaiUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiChatChunkChoice {
    pub index: u32,
    pub delta: OpenaiChatDelta,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenaiChatDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenaiToolCallDelta>>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Indexed tool-call delta fragment, per the OpenAI streaming wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiToolCallDelta {
    pub index: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<OpenaiFunctionCall>,
}

impl OpenaiChatCompletionChunk {
    pub fn new(id: &str, created: i64, model: &str, delta: OpenaiChatDelta) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![OpenaiChatChunkChoice {
                index: 0,
                delta,
                finish_reason: None,
            }],
            usage: None,
        }
    }
}
