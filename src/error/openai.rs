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

/// Error envelope for the `/v1/chat/completions` and `/v1/models` surface.
#[derive(Debug, ThisError)]
pub enum OpenAiError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("no available token")]
    NoAvailableCredential,

    #[error("upstream error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for OpenAiError {
    fn from(rejection: JsonRejection) -> Self {
        OpenAiError::InvalidRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<GatewayError> for OpenAiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NoAvailableCredential => OpenAiError::NoAvailableCredential,
            GatewayError::UpstreamStatus(status) | GatewayError::Oauth(OauthError::UpstreamStatus(status)) => {
                OpenAiError::Upstream {
                    status,
                    message: format!("upstream returned {status}"),
                }
            }
            GatewayError::ReqwestError(e) => OpenAiError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                message: e.to_string(),
            },
            GatewayError::StreamProtocolError(m) => OpenAiError::Internal(m),
            other => OpenAiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for OpenAiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            OpenAiError::InvalidRequest { message } => (
                StatusCode::BAD_REQUEST,
                OpenAiErrorObject {
                    message,
                    error_type: "invalid_request_error".to_string(),
                    param: None,
                    code: None,
                },
            ),
            OpenAiError::NoAvailableCredential => (
                StatusCode::INTERNAL_SERVER_ERROR,
                OpenAiErrorObject {
                    message: "no available token".to_string(),
                    error_type: "server_error".to_string(),
                    param: None,
                    code: None,
                },
            ),
            OpenAiError::Upstream { status, message } => {
                tracing::warn!(%status, %message, "openai surface: upstream error");
                (
                    status,
                    OpenAiErrorObject {
                        message,
                        error_type: "upstream_error".to_string(),
                        param: None,
                        code: Some(status.as_u16().to_string()),
                    },
                )
            }
            OpenAiError::Internal(message) => {
                tracing::error!(%message, "openai surface: internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    OpenAiErrorObject {
                        message: "An internal server error occurred.".to_string(),
                        error_type: "server_error".to_string(),
                        param: None,
                        code: None,
                    },
                )
            }
        };
        (status, Json(OpenAiErrorBody { error })).into_response()
    }
}

#[derive(Serialize)]
pub struct OpenAiErrorBody {
    pub error: OpenAiErrorObject,
}

#[derive(Serialize)]
pub struct OpenAiErrorObject {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
