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

/// Error envelope for the `/v1/messages` surface.
#[derive(Debug, ThisError)]
pub enum ClaudeError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("no available token")]
    NoAvailableCredential,

    #[error("upstream error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ClaudeError {
    fn from(rejection: JsonRejection) -> Self {
        ClaudeError::InvalidRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<GatewayError> for ClaudeError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NoAvailableCredential => ClaudeError::NoAvailableCredential,
            GatewayError::UpstreamStatus(status) | GatewayError::Oauth(OauthError::UpstreamStatus(status)) => {
                ClaudeError::Upstream {
                    status,
                    message: format!("upstream returned {status}"),
                }
            }
            GatewayError::ReqwestError(e) => ClaudeError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                message: e.to_string(),
            },
            GatewayError::StreamProtocolError(m) => ClaudeError::Internal(m),
            other => ClaudeError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ClaudeError {
    fn into_response(self) -> Response {
        let (status, obj) = match self {
            ClaudeError::InvalidRequest { message } => (
                StatusCode::BAD_REQUEST,
                ClaudeErrorObject {
                    error_type: "invalid_request_error".to_string(),
                    message,
                },
            ),
            ClaudeError::NoAvailableCredential => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ClaudeErrorObject {
                    error_type: "api_error".to_string(),
                    message: "no available token".to_string(),
                },
            ),
            ClaudeError::Upstream { status, message } => {
                tracing::warn!(%status, %message, "claude surface: upstream error");
                let error_type = match status {
                    StatusCode::TOO_MANY_REQUESTS => "rate_limit_error",
                    StatusCode::UNAUTHORIZED => "authentication_error",
                    StatusCode::FORBIDDEN => "permission_error",
                    StatusCode::NOT_FOUND => "not_found_error",
                    _ => "api_error",
                };
                (
                    status,
                    ClaudeErrorObject {
                        error_type: error_type.to_string(),
                        message,
                    },
                )
            }
            ClaudeError::Internal(message) => {
                tracing::error!(%message, "claude surface: internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ClaudeErrorObject {
                        error_type: "api_error".to_string(),
                        message: "An internal server error occurred.".to_string(),
                    },
                )
            }
        };
        (status, Json(ClaudeErrorBody::new(obj))).into_response()
    }
}

#[derive(Serialize)]
pub struct ClaudeErrorBody {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub error: ClaudeErrorObject,
}

impl ClaudeErrorBody {
    fn new(error: ClaudeErrorObject) -> Self {
        Self { kind: "error", error }
    }
}

#[derive(Serialize)]
pub struct ClaudeErrorObject {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}
