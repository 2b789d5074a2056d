mod claude;
mod gateway;
mod gemini;
mod oauth;
mod openai;
mod upstream;

pub use claude::{ClaudeError, ClaudeErrorBody, ClaudeErrorObject};
pub use gateway::{ApiErrorBody, ApiErrorObject, GatewayError};
pub use gemini::{GeminiError, GeminiErrorBody, GeminiErrorObject};
pub use oauth::OauthError;
pub use openai::{OpenAiError, OpenAiErrorBody, OpenAiErrorObject};
pub use upstream::{UpstreamErrorBody, UpstreamErrorObject};

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
