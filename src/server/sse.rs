//! Shared SSE keep-alive helper. Axum's `KeepAlive` comment-line ticker
//! already matches the `: heartbeat\n\n` framing every surface's stream
//! endpoints are expected to emit while idle.

use std::time::Duration;

use axum::response::sse::KeepAlive;

pub fn heartbeat(interval_secs: u64) -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(interval_secs))
        .text("heartbeat")
}
