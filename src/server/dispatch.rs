//! Glues the credential rotator to the upstream requester: acquires a
//! live credential, drives the retry-on-credential-failure loop, and
//! feeds the rotator the right signal back when a call fails.
//!
//! Grounded in `providers/antigravity/client/client.rs`'s
//! acquire-credential-then-call pattern and the rotator's own
//! ban/rate-limit/invalid action vocabulary (`upstream::policy::ActionForError`).

use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;

use crate::credentials::{Credential, RotatorHandle};
use crate::error::GatewayError;
use crate::quota::{ModelQuota, QuotaCache};
use crate::server::router::GatewayState;
use crate::signature_cache::SignatureCaches;
use crate::translate::{UnaryResult, UpstreamDelta};
use crate::upstream::{self, ActionForError};
use gateway_schema::AntigravityRequestBody;

/// Pulls the next live credential from the rotator, mapping `None`
/// (nothing available, every credential disabled or quota-exhausted) to
/// the same "no available token" error the rest of the gateway surfaces.
pub async fn acquire_credential(state: &GatewayState) -> Result<Credential, GatewayError> {
    state
        .rotator
        .get_token()
        .await?
        .ok_or(GatewayError::NoAvailableCredential)
}

/// Applies the rotator-facing side effect of an upstream failure. Rate
/// limits mark the credential's quota exhausted (tried again once quota
/// resets) and record the upstream-reported retry window in the Quota
/// Cache; bans and invalid-credential responses disable the credential
/// outright; unsupported-model and no-op actions leave it untouched.
pub fn apply_error_action(
    rotator: &RotatorHandle,
    quota: &QuotaCache,
    refresh_token: &str,
    model: &str,
    action: &ActionForError,
) {
    match action {
        ActionForError::Ban | ActionForError::Invalid => {
            rotator.disable_token(refresh_token.to_string());
        }
        ActionForError::RateLimit(retry_after) => {
            rotator.mark_quota_exhausted(refresh_token.to_string());
            let reset_time = (Utc::now() + ChronoDuration::from_std(*retry_after).unwrap_or_default()).to_rfc3339();
            let mut models = HashMap::new();
            models.insert(model.to_string(), ModelQuota { remaining: 0, reset_time });
            quota.update(refresh_token, models);
        }
        ActionForError::ModelUnsupported | ActionForError::None => {}
    }
}

/// `true` if the Quota Cache already knows this credential has no
/// remaining quota for `model` within its read-TTL, sparing a round-trip
/// that would just come back 429.
fn quota_known_exhausted(quota: &QuotaCache, refresh_token: &str, model: &str) -> bool {
    quota
        .get(refresh_token)
        .and_then(|entry| entry.models.get(model).map(|mq| mq.remaining <= 0))
        .unwrap_or(false)
}

/// Records any thought signature carried on this delta, keyed by model, so
/// the Request Translator can stitch it back into a later turn.
fn record_delta_signature(caches: &SignatureCaches, model: &str, delta: &UpstreamDelta) {
    match delta {
        UpstreamDelta::Reasoning { thought_signature: Some(sig), .. } => {
            caches.reasoning.set(model, sig.clone());
        }
        UpstreamDelta::ToolCalls(calls) => {
            for call in calls {
                if let Some(sig) = &call.thought_signature {
                    caches.tool_call.set(model, sig.clone());
                }
            }
        }
        _ => {}
    }
}

/// Same recording, for the flattened unary result.
fn record_unary_signatures(caches: &SignatureCaches, model: &str, result: &UnaryResult) {
    if let Some(sig) = &result.reasoning_signature {
        caches.reasoning.set(model, sig.clone());
    }
    for call in &result.tool_calls {
        if let Some(sig) = &call.thought_signature {
            caches.tool_call.set(model, sig.clone());
        }
    }
}

/// Whether a failure is worth retrying against another credential. Rate
/// limits and credential-health problems (ban, invalid) are; everything
/// else (unsupported model, an unmapped status) is a property of the
/// request itself, not the credential, so retrying it would just repeat
/// the same failure on a different token. Those fail fast.
fn is_retryable_action(action: &ActionForError) -> bool {
    matches!(action, ActionForError::RateLimit(_) | ActionForError::Ban | ActionForError::Invalid)
}

/// Runs a unary upstream call, retrying on a fresh credential up to
/// `upstream.retry_times` times when a credential turns out to be dead.
/// `build` is handed each candidate credential's project id and returns
/// the fully wrapped request body for it.
pub async fn run_unary(
    state: &GatewayState,
    mut build: impl FnMut(&Credential) -> AntigravityRequestBody,
) -> Result<(UnaryResult, String), GatewayError> {
    let attempts = state.upstream.retry_times.max(1);
    let mut last_err = GatewayError::NoAvailableCredential;

    for _ in 0..attempts {
        let credential = acquire_credential(state).await?;
        let access_token = credential
            .access_token
            .clone()
            .ok_or(GatewayError::MissingAccessToken)?;
        let body = build(&credential);
        let model = body.model.clone();

        if quota_known_exhausted(&state.quota, &credential.refresh_token, &model) {
            state.rotator.mark_quota_exhausted(credential.refresh_token.clone());
            continue;
        }

        match upstream::unary_generate(&state.client, &state.endpoints, &access_token, &body).await {
            Ok(result) => {
                record_unary_signatures(&state.signature_caches, &model, &result);
                return Ok((result, model));
            }
            Err((action, err)) => {
                apply_error_action(&state.rotator, &state.quota, &credential.refresh_token, &model, &action);
                if !is_retryable_action(&action) {
                    return Err(err);
                }
                last_err = err;
            }
        }
    }

    Err(last_err)
}

/// Runs a streaming upstream call with the same credential-retry loop,
/// except the loop only retries once no delta has reached the caller
/// yet. Once any delta has been forwarded the stream is already visible
/// to the client, so a later failure is reported as a mid-stream abort
/// instead of silently restarting on another credential.
pub async fn run_stream(
    state: &GatewayState,
    mut build: impl FnMut(&Credential) -> AntigravityRequestBody,
    mut on_delta: impl FnMut(UpstreamDelta),
) -> Result<String, GatewayError> {
    let attempts = state.upstream.retry_times.max(1);
    let mut last_err = GatewayError::NoAvailableCredential;

    for _ in 0..attempts {
        let credential = acquire_credential(state).await?;
        let access_token = credential
            .access_token
            .clone()
            .ok_or(GatewayError::MissingAccessToken)?;
        let body = build(&credential);
        let model = body.model.clone();

        if quota_known_exhausted(&state.quota, &credential.refresh_token, &model) {
            state.rotator.mark_quota_exhausted(credential.refresh_token.clone());
            continue;
        }

        let mut forwarded_any = false;
        let result = upstream::stream_generate(&state.client, &state.endpoints, &access_token, &body, |delta| {
            forwarded_any = true;
            record_delta_signature(&state.signature_caches, &model, &delta);
            on_delta(delta);
        })
        .await;

        match result {
            Ok(()) => return Ok(model),
            Err((action, err)) if !forwarded_any => {
                apply_error_action(&state.rotator, &state.quota, &credential.refresh_token, &model, &action);
                if !is_retryable_action(&action) {
                    return Err(err);
                }
                last_err = err;
            }
            Err((_, err)) => return Err(err),
        }
    }

    Err(last_err)
}
