//! Performs the actual HTTP calls against the antigravity upstream and
//! turns the raw Gemini-shaped responses into the internal delta union,
//! streaming and unary alike.
//!
//! Grounded in `providers/antigravity/client/client.rs`'s envelope/header
//! building and `server/routes/{geminicli,codex}/respond.rs`'s SSE-consumption
//! idiom (`.eventsource()` + a 60s idle timeout via `tokio_stream`).

use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use gateway_schema::gemini::GeminiResponseBody;
use gateway_schema::AntigravityRequestBody;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tokio_stream::StreamExt as _;

use crate::error::{GatewayError, UpstreamErrorBody};
use crate::translate::delta::{from_gemini_chunk, from_gemini_unary};
use crate::translate::{UnaryResult, UpstreamDelta};

use super::policy::{classify_upstream_error, ActionForError};
use super::retry::post_json_with_retry;
use super::{UpstreamEndpoints, ANTIGRAVITY_USER_AGENT};

const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

fn build_headers(access_token: &str) -> Result<HeaderMap, GatewayError> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
        .map_err(|e| GatewayError::UnexpectedError(e.to_string()))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert("User-Agent", HeaderValue::from_static(ANTIGRAVITY_USER_AGENT));
    Ok(headers)
}

async fn classify_error_response(resp: reqwest::Response) -> (ActionForError, GatewayError) {
    let status = resp.status();
    classify_upstream_error::<UpstreamErrorBody, GatewayError>(
        resp,
        move |_err| GatewayError::UpstreamStatus(status),
        move |status, _raw| GatewayError::UpstreamStatus(status),
    )
    .await
}

/// Streams a `generateContent` call, invoking `on_delta` for every delta
/// produced by each SSE chunk in arrival order. Returns the action to
/// apply to the credential pool on failure (`ActionForError::None` on
/// full success).
pub async fn stream_generate(
    client: &reqwest::Client,
    endpoints: &UpstreamEndpoints,
    access_token: &str,
    body: &AntigravityRequestBody,
    mut on_delta: impl FnMut(UpstreamDelta),
) -> Result<(), (ActionForError, GatewayError)> {
    let headers = build_headers(access_token).map_err(|e| (ActionForError::None, e))?;

    let resp = post_json_with_retry("antigravity", client, endpoints.select(true), Some(headers), body)
        .await
        .map_err(|e| (ActionForError::None, GatewayError::ReqwestError(e)))?;

    if !resp.status().is_success() {
        return Err(classify_error_response(resp).await);
    }

    let mut stream = resp.bytes_stream().eventsource().timeout(IDLE_TIMEOUT);

    while let Some(timed) = stream.next().await {
        let event = timed
            .map_err(|_| (ActionForError::None, GatewayError::StreamProtocolError("idle timeout waiting for upstream".to_string())))?
            .map_err(|e| (ActionForError::None, GatewayError::StreamProtocolError(e.to_string())))?;

        if event.data.is_empty() || event.data == "[DONE]" {
            continue;
        }

        let chunk: GeminiResponseBody = serde_json::from_str(&event.data)
            .map_err(|e| (ActionForError::None, GatewayError::JsonError(e)))?;

        for delta in from_gemini_chunk(&chunk) {
            on_delta(delta);
        }
    }

    Ok(())
}

/// Performs a single unary `generateContent` call and flattens the result.
pub async fn unary_generate(
    client: &reqwest::Client,
    endpoints: &UpstreamEndpoints,
    access_token: &str,
    body: &AntigravityRequestBody,
) -> Result<UnaryResult, (ActionForError, GatewayError)> {
    let headers = build_headers(access_token).map_err(|e| (ActionForError::None, e))?;

    let resp = post_json_with_retry("antigravity", client, endpoints.select(false), Some(headers), body)
        .await
        .map_err(|e| (ActionForError::None, GatewayError::ReqwestError(e)))?;

    if !resp.status().is_success() {
        return Err(classify_error_response(resp).await);
    }

    let chunk: GeminiResponseBody = resp
        .json()
        .await
        .map_err(|e| (ActionForError::None, GatewayError::ReqwestError(e)))?;

    Ok(from_gemini_unary(chunk))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_carry_bearer_and_user_agent() {
        let headers = build_headers("tok").unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(headers.get("User-Agent").unwrap(), ANTIGRAVITY_USER_AGENT);
    }
}
