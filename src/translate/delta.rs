//! The internal delta union the Upstream Requester produces and the
//! Response Translator consumes. Built from parsed upstream Gemini-shaped
//! chunks, not deserialized directly off the wire.

use gateway_schema::gemini::GeminiResponseBody;
use serde_json::Value;

/// One semantically distinct fragment of an upstream chunk. A single
/// upstream SSE event may produce more than one of these in order.
#[derive(Debug, Clone)]
pub enum UpstreamDelta {
    Content(String),
    Reasoning {
        reasoning_content: String,
        thought_signature: Option<String>,
    },
    ToolCalls(Vec<ToolCallDelta>),
    Usage(UsageDelta),
}

#[derive(Debug, Clone)]
pub struct ToolCallDelta {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments, exactly as the wire format expects.
    pub arguments: String,
    pub thought_signature: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageDelta {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Full unary (non-streaming) upstream result, flattened from the first
/// candidate.
#[derive(Debug, Clone, Default)]
pub struct UnaryResult {
    pub content: Option<String>,
    pub reasoning_content: Option<String>,
    pub reasoning_signature: Option<String>,
    pub tool_calls: Vec<ToolCallDelta>,
    pub usage: Option<UsageDelta>,
}

fn usage_from_value(value: &Value) -> UsageDelta {
    UsageDelta {
        prompt_tokens: value.get("promptTokenCount").and_then(Value::as_u64).unwrap_or(0) as u32,
        completion_tokens: value.get("candidatesTokenCount").and_then(Value::as_u64).unwrap_or(0) as u32,
        total_tokens: value.get("totalTokenCount").and_then(Value::as_u64).unwrap_or(0) as u32,
    }
}

fn tool_call_from_function_call(fc: &Value, thought_signature: Option<String>) -> ToolCallDelta {
    ToolCallDelta {
        id: fc.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
        name: fc.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
        arguments: fc.get("args").map(ToString::to_string).unwrap_or_else(|| "{}".to_string()),
        thought_signature,
    }
}

/// Walks one upstream SSE chunk's first candidate and produces the
/// (possibly several) deltas it represents, in encounter order, followed
/// by a trailing usage delta if the chunk carried `usageMetadata`.
pub fn from_gemini_chunk(chunk: &GeminiResponseBody) -> Vec<UpstreamDelta> {
    let mut out = Vec::new();

    if let Some(content) = chunk.candidates.first().and_then(|c| c.content.as_ref()) {
        let mut tool_calls = Vec::new();
        for part in &content.parts {
            if let Some(fc) = &part.function_call {
                tool_calls.push(tool_call_from_function_call(fc, part.thought_signature.clone()));
                continue;
            }
            if let Some(text) = &part.text {
                if part.thought == Some(true) {
                    out.push(UpstreamDelta::Reasoning {
                        reasoning_content: text.clone(),
                        thought_signature: part.thought_signature.clone(),
                    });
                } else if !text.is_empty() {
                    out.push(UpstreamDelta::Content(text.clone()));
                }
            }
        }
        if !tool_calls.is_empty() {
            out.push(UpstreamDelta::ToolCalls(tool_calls));
        }
    }

    if let Some(usage) = &chunk.usageMetadata {
        out.push(UpstreamDelta::Usage(usage_from_value(usage)));
    }

    out
}

/// Flattens a full unary response into a single `UnaryResult`, concatenating
/// any split text/reasoning parts.
pub fn from_gemini_unary(chunk: GeminiResponseBody) -> UnaryResult {
    let mut result = UnaryResult::default();

    if let Some(content) = chunk.candidates.into_iter().next().and_then(|c| c.content) {
        for part in content.parts {
            if let Some(fc) = &part.function_call {
                result
                    .tool_calls
                    .push(tool_call_from_function_call(fc, part.thought_signature.clone()));
                continue;
            }
            if let Some(text) = part.text {
                if part.thought == Some(true) {
                    let mut reasoning = result.reasoning_content.take().unwrap_or_default();
                    reasoning.push_str(&text);
                    result.reasoning_content = Some(reasoning);
                    result.reasoning_signature = part.thought_signature.or(result.reasoning_signature.take());
                } else if !text.is_empty() {
                    let mut content = result.content.take().unwrap_or_default();
                    content.push_str(&text);
                    result.content = Some(content);
                }
            }
        }
    }

    if let Some(usage) = &chunk.usageMetadata {
        result.usage = Some(usage_from_value(usage));
    }

    result
}

#[cfg(test)]
mod chunk_parsing_tests {
    use super::*;
    use gateway_schema::gemini::{Candidate, Content, Part};
    use serde_json::json;

    fn chunk_with_parts(parts: Vec<Part>) -> GeminiResponseBody {
        GeminiResponseBody {
            candidates: vec![Candidate {
                content: Some(Content { role: Some("model".to_string()), parts, extra: Default::default() }),
                index: Some(0),
                finish_reason: None,
                extra: Default::default(),
            }],
            promptFeedback: None,
            usageMetadata: None,
            modelVersion: None,
            responseId: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn text_part_becomes_content_delta() {
        let chunk = chunk_with_parts(vec![Part { text: Some("hi".to_string()), ..Default::default() }]);
        let deltas = from_gemini_chunk(&chunk);
        assert!(matches!(&deltas[0], UpstreamDelta::Content(text) if text == "hi"));
    }

    #[test]
    fn thought_part_becomes_reasoning_delta() {
        let chunk = chunk_with_parts(vec![Part {
            thought: Some(true),
            text: Some("thinking".to_string()),
            thought_signature: Some("sig".to_string()),
            ..Default::default()
        }]);
        let deltas = from_gemini_chunk(&chunk);
        assert!(matches!(
            &deltas[0],
            UpstreamDelta::Reasoning { reasoning_content, thought_signature }
                if reasoning_content == "thinking" && thought_signature.as_deref() == Some("sig")
        ));
    }

    #[test]
    fn function_call_part_becomes_tool_call_delta() {
        let chunk = chunk_with_parts(vec![Part {
            function_call: Some(json!({"id": "1", "name": "lookup", "args": {"q": "x"}})),
            ..Default::default()
        }]);
        let deltas = from_gemini_chunk(&chunk);
        assert!(matches!(&deltas[0], UpstreamDelta::ToolCalls(calls) if calls[0].name == "lookup"));
    }

    #[test]
    fn unary_concatenates_split_text_parts() {
        let mut chunk = chunk_with_parts(vec![
            Part { text: Some("hello ".to_string()), ..Default::default() },
            Part { text: Some("world".to_string()), ..Default::default() },
        ]);
        chunk.usageMetadata = Some(json!({"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}));
        let result = from_gemini_unary(chunk);
        assert_eq!(result.content.as_deref(), Some("hello world"));
        assert_eq!(result.usage.unwrap().total_tokens, 5);
    }
}
