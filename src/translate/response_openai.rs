//! Translates `UpstreamDelta`/`UnaryResult` into OpenAI chat-completion
//! chunks and the non-streaming completion object.

use gateway_schema::openai::{
    OpenaiChatChoice, OpenaiChatChoiceMessage, OpenaiChatCompletion, OpenaiChatCompletionChunk,
    OpenaiChatDelta, OpenaiFunctionCall, OpenaiToolCall, OpenaiToolCallDelta, OpenaiUsage,
};

use super::delta::{UnaryResult, UpstreamDelta, UsageDelta};

/// Tracks the running tool-call index across a stream, since OpenAI's
/// wire format wants each tool-call delta numbered in emission order.
#[derive(Default)]
pub struct OpenaiStreamState {
    next_tool_index: u32,
}

impl OpenaiStreamState {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_usage(usage: UsageDelta) -> OpenaiUsage {
    OpenaiUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

/// One streamed chunk. Returns `None` for deltas with no client-visible
/// payload (bare usage rides on the final chunk instead).
pub fn stream_chunk(
    state: &mut OpenaiStreamState,
    id: &str,
    created: i64,
    model: &str,
    delta: &UpstreamDelta,
) -> Option<OpenaiChatCompletionChunk> {
    let openai_delta = match delta {
        UpstreamDelta::Content(text) => {
            OpenaiChatDelta { content: Some(text.clone()), ..Default::default() }
        }
        UpstreamDelta::Reasoning { reasoning_content, .. } => {
            OpenaiChatDelta { reasoning_content: Some(reasoning_content.clone()), ..Default::default() }
        }
        UpstreamDelta::ToolCalls(calls) => {
            let tool_calls = calls
                .iter()
                .map(|call| {
                    let index = state.next_tool_index;
                    state.next_tool_index += 1;
                    OpenaiToolCallDelta {
                        index,
                        id: Some(call.id.clone()),
                        kind: Some("function".to_string()),
                        function: Some(OpenaiFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        }),
                    }
                })
                .collect();
            OpenaiChatDelta { tool_calls: Some(tool_calls), ..Default::default() }
        }
        UpstreamDelta::Usage(_) => return None,
    };
    Some(OpenaiChatCompletionChunk::new(id, created, model, openai_delta))
}

/// The terminal chunk: empty delta, a finish reason, and accumulated usage.
pub fn final_chunk(
    id: &str,
    created: i64,
    model: &str,
    finish_reason: &str,
    usage: Option<UsageDelta>,
) -> OpenaiChatCompletionChunk {
    let mut chunk = OpenaiChatCompletionChunk::new(id, created, model, OpenaiChatDelta::default());
    chunk.choices[0].finish_reason = Some(finish_reason.to_string());
    chunk.usage = usage.map(to_usage);
    chunk
}

pub fn completion_from_unary(
    id: &str,
    created: i64,
    model: &str,
    result: UnaryResult,
    finish_reason: &str,
) -> OpenaiChatCompletion {
    let tool_calls = (!result.tool_calls.is_empty()).then(|| {
        result
            .tool_calls
            .iter()
            .map(|call| OpenaiToolCall {
                id: call.id.clone(),
                kind: "function".to_string(),
                function: OpenaiFunctionCall { name: call.name.clone(), arguments: call.arguments.clone() },
            })
            .collect()
    });

    OpenaiChatCompletion {
        id: id.to_string(),
        object: "chat.completion".to_string(),
        created,
        model: model.to_string(),
        choices: vec![OpenaiChatChoice {
            index: 0,
            message: OpenaiChatChoiceMessage {
                role: "assistant".to_string(),
                content: result.content,
                reasoning_content: result.reasoning_content,
                tool_calls,
            },
            finish_reason: Some(finish_reason.to_string()),
        }],
        usage: result.usage.map(to_usage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::delta::ToolCallDelta;

    #[test]
    fn content_delta_becomes_chunk() {
        let mut state = OpenaiStreamState::new();
        let chunk = stream_chunk(&mut state, "id-1", 0, "gpt-4o", &UpstreamDelta::Content("hi".to_string())).unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("hi"));
    }

    #[test]
    fn tool_call_deltas_get_sequential_indices() {
        let mut state = OpenaiStreamState::new();
        let calls = vec![
            ToolCallDelta { id: "1".to_string(), name: "a".to_string(), arguments: "{}".to_string(), thought_signature: None },
            ToolCallDelta { id: "2".to_string(), name: "b".to_string(), arguments: "{}".to_string(), thought_signature: None },
        ];
        let chunk = stream_chunk(&mut state, "id-1", 0, "gpt-4o", &UpstreamDelta::ToolCalls(calls)).unwrap();
        let tool_calls = chunk.choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(tool_calls[0].index, 0);
        assert_eq!(tool_calls[1].index, 1);
    }

    #[test]
    fn usage_only_delta_yields_no_chunk() {
        let mut state = OpenaiStreamState::new();
        let chunk = stream_chunk(&mut state, "id-1", 0, "gpt-4o", &UpstreamDelta::Usage(UsageDelta::default()));
        assert!(chunk.is_none());
    }

    #[test]
    fn completion_from_unary_sets_finish_reason() {
        let completion = completion_from_unary("id-1", 0, "gpt-4o", UnaryResult::default(), "stop");
        assert_eq!(completion.choices[0].finish_reason.as_deref(), Some("stop"));
    }
}
