mod endpoints;
mod policy;
mod requester;
mod retry;

pub use endpoints::UpstreamEndpoints;
pub use policy::{ActionForError, MappingAction, UPSTREAM_BODY_PREVIEW_CHARS, classify_upstream_error};
pub use requester::{stream_generate, unary_generate};
pub(crate) use retry::post_json_with_retry;

pub const ANTIGRAVITY_USER_AGENT: &str = "antigravity/1.15.8 windows/amd64";
