use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error as ThisError;

use super::gateway::GatewayError;
use super::oauth::OauthError;

/// Error envelope for the `/v1beta/models*` and `generateContent` surface.
#[derive(Debug, ThisError)]
pub enum GeminiError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("no available token")]
    NoAvailableCredential,

    #[error("upstream error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for GeminiError {
    fn from(rejection: JsonRejection) -> Self {
        GeminiError::InvalidRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<GatewayError> for GeminiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NoAvailableCredential => GeminiError::NoAvailableCredential,
            GatewayError::UpstreamStatus(status) | GatewayError::Oauth(OauthError::UpstreamStatus(status)) => {
                GeminiError::Upstream {
                    status,
                    message: format!("upstream returned {status}"),
                }
            }
            GatewayError::ReqwestError(e) => GeminiError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                message: e.to_string(),
            },
            GatewayError::StreamProtocolError(m) => GeminiError::Internal(m),
            other => GeminiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for GeminiError {
    fn into_response(self) -> Response {
        let (status, obj) = match self {
            GeminiError::InvalidRequest { message } => (
                StatusCode::BAD_REQUEST,
                GeminiErrorObject::for_status(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", message),
            ),
            GeminiError::NoAvailableCredential => (
                StatusCode::INTERNAL_SERVER_ERROR,
                GeminiErrorObject::for_status(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UNAVAILABLE",
                    "no available token",
                ),
            ),
            GeminiError::Upstream { status, message } => {
                tracing::warn!(%status, %message, "gemini surface: upstream error");
                let status_str = match status {
                    StatusCode::TOO_MANY_REQUESTS => "RESOURCE_EXHAUSTED",
                    StatusCode::UNAUTHORIZED => "UNAUTHENTICATED",
                    StatusCode::FORBIDDEN => "PERMISSION_DENIED",
                    StatusCode::NOT_FOUND => "NOT_FOUND",
                    _ => "UNKNOWN",
                };
                (status, GeminiErrorObject::for_status(status, status_str, message))
            }
            GeminiError::Internal(message) => {
                tracing::error!(%message, "gemini surface: internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GeminiErrorObject::for_status(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL",
                        "An internal server error occurred.",
                    ),
                )
            }
        };
        (status, Json(GeminiErrorBody { inner: obj })).into_response()
    }
}

#[derive(Serialize)]
pub struct GeminiErrorBody {
    #[serde(rename = "error")]
    pub inner: GeminiErrorObject,
}

#[derive(Serialize)]
pub struct GeminiErrorObject {
    pub code: u16,
    pub message: String,
    pub status: String,
}

impl GeminiErrorObject {
    fn for_status(code: StatusCode, status: &'static str, message: impl Into<String>) -> Self {
        GeminiErrorObject {
            code: code.as_u16(),
            message: message.into(),
            status: status.to_string(),
        }
    }
}
