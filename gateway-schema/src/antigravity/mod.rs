mod antigravity_request;

pub use antigravity_request::{AntigravityRequestBody, AntigravityRequestMeta};
