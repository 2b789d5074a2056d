//! Translates `UpstreamDelta`/`UnaryResult` back into the Gemini wire
//! shape. Since the upstream itself speaks a Gemini-like dialect this is
//! close to a passthrough, modulo signature-forwarding policy and the
//! always-STOP finish reason (see DESIGN.md).

use gateway_schema::gemini::{Candidate, Content, GeminiResponseBody, Part};
use serde_json::{Value, json};

use super::delta::{UnaryResult, UpstreamDelta, UsageDelta};

fn content_from_delta(delta: &UpstreamDelta, pass_signature: bool) -> Option<Content> {
    let parts = match delta {
        UpstreamDelta::Content(text) => vec![Part { text: Some(text.clone()), ..Default::default() }],
        UpstreamDelta::Reasoning { reasoning_content, thought_signature } => {
            vec![Part {
                thought: Some(true),
                text: Some(reasoning_content.clone()),
                thought_signature: pass_signature.then(|| thought_signature.clone()).flatten(),
                ..Default::default()
            }]
        }
        UpstreamDelta::ToolCalls(calls) => calls
            .iter()
            .map(|call| {
                let args: Value = serde_json::from_str(&call.arguments).unwrap_or(Value::Null);
                Part {
                    function_call: Some(json!({ "id": call.id, "name": call.name, "args": args })),
                    thought_signature: pass_signature.then(|| call.thought_signature.clone()).flatten(),
                    ..Default::default()
                }
            })
            .collect(),
        UpstreamDelta::Usage(_) => return None,
    };
    Some(Content { role: Some("model".to_string()), parts, extra: Default::default() })
}

fn usage_metadata(usage: UsageDelta) -> Value {
    json!({
        "promptTokenCount": usage.prompt_tokens,
        "candidatesTokenCount": usage.completion_tokens,
        "totalTokenCount": usage.total_tokens,
    })
}

/// One streamed SSE chunk body. Returns `None` for deltas that carry no
/// representable content (bare usage updates ride on the final chunk).
pub fn stream_chunk(delta: &UpstreamDelta, model: &str, pass_signature: bool) -> Option<GeminiResponseBody> {
    let content = content_from_delta(delta, pass_signature)?;
    Some(GeminiResponseBody {
        candidates: vec![Candidate { content: Some(content), index: Some(0), finish_reason: None, extra: Default::default() }],
        promptFeedback: None,
        usageMetadata: None,
        modelVersion: Some(model.to_string()),
        responseId: None,
        extra: Default::default(),
    })
}

/// The terminal chunk: no content, `finishReason: "STOP"`, and whatever
/// usage totals accumulated across the stream.
pub fn final_chunk(model: &str, usage: Option<UsageDelta>) -> GeminiResponseBody {
    GeminiResponseBody {
        candidates: vec![Candidate { content: None, index: Some(0), finish_reason: Some("STOP".to_string()), extra: Default::default() }],
        promptFeedback: None,
        usageMetadata: usage.map(usage_metadata),
        modelVersion: Some(model.to_string()),
        responseId: None,
        extra: Default::default(),
    }
}

pub fn body_from_unary(result: UnaryResult, model: &str, pass_signature: bool) -> GeminiResponseBody {
    let mut parts = Vec::new();
    if let Some(reasoning) = result.reasoning_content {
        parts.push(Part {
            thought: Some(true),
            text: Some(reasoning),
            thought_signature: pass_signature.then(|| result.reasoning_signature.clone()).flatten(),
            ..Default::default()
        });
    }
    if let Some(content) = result.content {
        parts.push(Part { text: Some(content), ..Default::default() });
    }
    for call in &result.tool_calls {
        let args: Value = serde_json::from_str(&call.arguments).unwrap_or(Value::Null);
        parts.push(Part {
            function_call: Some(json!({ "id": call.id, "name": call.name, "args": args })),
            thought_signature: pass_signature.then(|| call.thought_signature.clone()).flatten(),
            ..Default::default()
        });
    }

    GeminiResponseBody {
        candidates: vec![Candidate {
            content: Some(Content { role: Some("model".to_string()), parts, extra: Default::default() }),
            index: Some(0),
            finish_reason: Some("STOP".to_string()),
            extra: Default::default(),
        }],
        promptFeedback: None,
        usageMetadata: result.usage.map(usage_metadata),
        modelVersion: Some(model.to_string()),
        responseId: None,
        extra: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::delta::ToolCallDelta;

    #[test]
    fn content_delta_becomes_text_part() {
        let chunk = stream_chunk(&UpstreamDelta::Content("hi".to_string()), "gemini-2.5-pro", true).unwrap();
        let content = chunk.candidates[0].content.as_ref().unwrap();
        assert_eq!(content.parts[0].text.as_deref(), Some("hi"));
    }

    #[test]
    fn signature_suppressed_when_policy_disabled() {
        let delta = UpstreamDelta::Reasoning {
            reasoning_content: "thinking".to_string(),
            thought_signature: Some("sig".to_string()),
        };
        let chunk = stream_chunk(&delta, "gemini-2.5-pro", false).unwrap();
        let content = chunk.candidates[0].content.as_ref().unwrap();
        assert!(content.parts[0].thought_signature.is_none());
    }

    #[test]
    fn final_chunk_always_stops() {
        let chunk = final_chunk("gemini-2.5-pro", None);
        assert_eq!(chunk.candidates[0].finish_reason.as_deref(), Some("STOP"));
        assert!(chunk.candidates[0].content.is_none());
    }

    #[test]
    fn unary_body_collects_tool_calls() {
        let result = UnaryResult {
            tool_calls: vec![ToolCallDelta {
                id: "1".to_string(),
                name: "lookup".to_string(),
                arguments: "{}".to_string(),
                thought_signature: None,
            }],
            ..Default::default()
        };
        let body = body_from_unary(result, "gemini-2.5-pro", true);
        let content = body.candidates[0].content.as_ref().unwrap();
        assert!(content.parts[0].function_call.is_some());
    }
}
