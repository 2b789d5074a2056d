//! The Claude surface's explicit block-cursor state machine. Unlike the
//! OpenAI/Gemini projections, Anthropic's `content_block_*` framing has
//! no direct upstream analog, so this is built fresh around the delta
//! union rather than adapted from any existing response shape.

use gateway_schema::claude::{
    ClaudeContentBlock, ClaudeMessagesResponse, ClaudeStreamEvent, ClaudeUsage, ContentBlockDelta,
    ContentBlockStartPayload, MessageDeltaPayload,
};
use serde_json::Value;

use super::delta::{UnaryResult, UpstreamDelta, UsageDelta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Cursor {
    #[default]
    None,
    Thinking,
    Text,
}

#[derive(Default)]
pub struct ClaudeStreamState {
    cursor: Cursor,
    index: u32,
    started_message: bool,
    prompt_tokens: u32,
}

impl ClaudeStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_open_block(&mut self, out: &mut Vec<ClaudeStreamEvent>) {
        if self.cursor != Cursor::None {
            out.push(ClaudeStreamEvent::ContentBlockStop { index: self.index });
            self.index += 1;
            self.cursor = Cursor::None;
        }
    }

    /// Feeds one upstream delta, returning the events it produces in order.
    pub fn push(&mut self, delta: &UpstreamDelta, pass_signature: bool, message: Value) -> Vec<ClaudeStreamEvent> {
        let mut out = Vec::new();
        if !self.started_message {
            out.push(ClaudeStreamEvent::MessageStart { message });
            self.started_message = true;
        }

        match delta {
            UpstreamDelta::Reasoning { reasoning_content, thought_signature } => {
                let signature = pass_signature.then(|| thought_signature.clone()).flatten();
                if self.cursor != Cursor::Thinking {
                    self.close_open_block(&mut out);
                    out.push(ClaudeStreamEvent::ContentBlockStart {
                        index: self.index,
                        content_block: ContentBlockStartPayload::Thinking {
                            thinking: String::new(),
                            signature: signature.clone(),
                        },
                    });
                    self.cursor = Cursor::Thinking;
                }
                out.push(ClaudeStreamEvent::ContentBlockDelta {
                    index: self.index,
                    delta: ContentBlockDelta::Thinking { thinking: reasoning_content.clone(), signature },
                });
            }
            UpstreamDelta::Content(text) => {
                if self.cursor != Cursor::Text {
                    self.close_open_block(&mut out);
                    out.push(ClaudeStreamEvent::ContentBlockStart {
                        index: self.index,
                        content_block: ContentBlockStartPayload::Text { text: String::new() },
                    });
                    self.cursor = Cursor::Text;
                }
                out.push(ClaudeStreamEvent::ContentBlockDelta {
                    index: self.index,
                    delta: ContentBlockDelta::Text { text: text.clone() },
                });
            }
            UpstreamDelta::ToolCalls(calls) => {
                self.close_open_block(&mut out);
                for call in calls {
                    out.push(ClaudeStreamEvent::ContentBlockStart {
                        index: self.index,
                        content_block: ContentBlockStartPayload::ToolUse {
                            id: call.id.clone(),
                            name: call.name.clone(),
                        },
                    });
                    out.push(ClaudeStreamEvent::ContentBlockDelta {
                        index: self.index,
                        delta: ContentBlockDelta::InputJson { partial_json: call.arguments.clone() },
                    });
                    out.push(ClaudeStreamEvent::ContentBlockStop { index: self.index });
                    self.index += 1;
                }
            }
            UpstreamDelta::Usage(usage) => {
                self.prompt_tokens = usage.prompt_tokens;
            }
        }
        out
    }

    /// Closes any open block and emits the terminal `message_delta`/`message_stop` pair.
    pub fn finish(&mut self, stop_reason: &str, usage: Option<UsageDelta>) -> Vec<ClaudeStreamEvent> {
        let mut out = Vec::new();
        self.close_open_block(&mut out);
        let output_tokens = usage.map(|u| u.completion_tokens).unwrap_or_default();
        out.push(ClaudeStreamEvent::MessageDelta {
            delta: MessageDeltaPayload { stop_reason: stop_reason.to_string() },
            usage: ClaudeUsage { input_tokens: self.prompt_tokens, output_tokens },
        });
        out.push(ClaudeStreamEvent::MessageStop);
        out
    }
}

pub fn response_from_unary(
    id: String,
    model: String,
    result: UnaryResult,
    stop_reason: &str,
    pass_signature: bool,
) -> ClaudeMessagesResponse {
    let mut blocks = Vec::new();
    if let Some(reasoning) = result.reasoning_content {
        blocks.push(ClaudeContentBlock::Thinking {
            thinking: reasoning,
            signature: pass_signature.then(|| result.reasoning_signature.clone()).flatten(),
        });
    }
    if let Some(content) = result.content {
        blocks.push(ClaudeContentBlock::Text { text: content });
    }
    for call in &result.tool_calls {
        let input: Value = serde_json::from_str(&call.arguments).unwrap_or(Value::Null);
        blocks.push(ClaudeContentBlock::ToolUse { id: call.id.clone(), name: call.name.clone(), input });
    }

    let mut response = ClaudeMessagesResponse::new(id, model, blocks);
    response.stop_reason = Some(stop_reason.to_string());
    if let Some(usage) = result.usage {
        response.usage = ClaudeUsage { input_tokens: usage.prompt_tokens, output_tokens: usage.completion_tokens };
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::delta::ToolCallDelta;
    use serde_json::json;

    #[test]
    fn thinking_then_text_closes_and_reopens_blocks() {
        let mut state = ClaudeStreamState::new();
        let events = state.push(
            &UpstreamDelta::Reasoning { reasoning_content: "hmm".to_string(), thought_signature: None },
            true,
            json!({}),
        );
        assert!(matches!(events[0], ClaudeStreamEvent::MessageStart { .. }));
        assert!(matches!(events[1], ClaudeStreamEvent::ContentBlockStart { .. }));

        let events = state.push(&UpstreamDelta::Content("hi".to_string()), true, json!({}));
        assert!(matches!(events[0], ClaudeStreamEvent::ContentBlockStop { index: 0 }));
        assert!(matches!(events[1], ClaudeStreamEvent::ContentBlockStart { index: 1, .. }));
    }

    #[test]
    fn tool_call_emits_start_delta_stop() {
        let mut state = ClaudeStreamState::new();
        let calls = vec![ToolCallDelta {
            id: "1".to_string(),
            name: "lookup".to_string(),
            arguments: "{}".to_string(),
            thought_signature: None,
        }];
        let events = state.push(&UpstreamDelta::ToolCalls(calls), true, json!({}));
        assert_eq!(events.len(), 4); // message_start + start + delta + stop
    }

    #[test]
    fn finish_closes_open_block_and_reports_usage() {
        let mut state = ClaudeStreamState::new();
        state.push(&UpstreamDelta::Content("hi".to_string()), true, json!({}));
        let events = state.finish("end_turn", Some(UsageDelta { prompt_tokens: 5, completion_tokens: 2, total_tokens: 7 }));
        assert!(matches!(events[0], ClaudeStreamEvent::ContentBlockStop { .. }));
        assert!(matches!(&events[1], ClaudeStreamEvent::MessageDelta { usage, .. } if usage.output_tokens == 2));
        assert!(matches!(events[2], ClaudeStreamEvent::MessageStop));
    }
}
