mod messages_request;
mod messages_response;
mod stream_event;

pub use messages_request::{ClaudeMessage, ClaudeMessagesRequest, ClaudeThinkingConfig};
pub use messages_response::{ClaudeContentBlock, ClaudeMessagesResponse, ClaudeUsage};
pub use stream_event::{
    ClaudeStreamEvent, ContentBlockDelta, ContentBlockStartPayload, MessageDeltaPayload,
};
