use crate::server::router::GatewayState;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde_json::json;
use subtle::ConstantTimeEq;

fn extract_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(k) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(k.to_string());
    }
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Gates every `/v1/*` and `/v1beta/*` route behind the configured API key.
#[derive(Debug, Clone, Copy)]
pub struct RequireKeyAuth;

impl FromRequestParts<GatewayState> for RequireKeyAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.api_key.as_ref();
        match extract_token(&parts.headers) {
            Some(key) if key.as_bytes().ct_eq(expected.as_bytes()).into() => Ok(RequireKeyAuth),
            _ => Err(AuthError),
        }
    }
}

/// Missing or mismatched API key. Both cases map to the same response per the
/// gateway's exact error contract.
pub struct AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid API Key" })),
        )
            .into_response()
    }
}
