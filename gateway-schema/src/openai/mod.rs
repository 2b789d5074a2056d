mod chat_request;
mod chat_response;
mod model_list;

pub use chat_request::{OpenaiChatMessage, OpenaiChatRequest, OpenaiFunctionCall, OpenaiToolCall};
pub use chat_response::{
    OpenaiChatChoice, OpenaiChatChoiceMessage, OpenaiChatChunkChoice, OpenaiChatCompletion,
    OpenaiChatCompletionChunk, OpenaiChatDelta, OpenaiToolCallDelta, OpenaiUsage,
};
pub use model_list::{OpenaiModel, OpenaiModelList};
