//! Builds upstream antigravity request bodies from the three inbound
//! dialects, and converts upstream deltas back into each dialect's wire
//! shapes (streaming and non-streaming).

pub mod delta;
pub mod models;
pub mod request;
pub mod response_claude;
pub mod response_gemini;
pub mod response_openai;

pub use delta::{ToolCallDelta, UnaryResult, UpstreamDelta, UsageDelta};
