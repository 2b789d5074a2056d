use axum::http::StatusCode;
use serde::Deserialize;

use crate::config::UpstreamConfig;
use crate::error::OauthError;

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Result of a successful refresh: the three fields the rotator persists.
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: i64,
    pub timestamp: i64,
}

/// POSTs `grant_type=refresh_token` to the Google OAuth2 token endpoint using
/// the baked-in client ID/secret. Mirrors the rotator's refresh step.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    cfg: &UpstreamConfig,
    refresh_token: &str,
) -> Result<RefreshedToken, OauthError> {
    let params = [
        ("client_id", cfg.oauth_client_id.as_str()),
        ("client_secret", cfg.oauth_client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    let response = client
        .post(&cfg.oauth_token_url)
        .form(&params)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(OauthError::UpstreamStatus(status));
    }

    let parsed: RefreshTokenResponse = response.json().await.map_err(|e| OauthError::Parse {
        message: e.to_string(),
        body: String::new(),
    })?;

    Ok(RefreshedToken {
        access_token: parsed.access_token,
        expires_in: parsed.expires_in,
        timestamp: now_ms(),
    })
}

#[derive(Debug, Deserialize)]
struct ProjectDiscoveryResponse {
    #[serde(rename = "cloudaicompanionProject")]
    cloudaicompanion_project: Option<String>,
}

/// Calls the upstream discovery endpoint to resolve the GCP project backing
/// this credential. A 401/403 here means the credential is ineligible.
pub async fn fetch_project_id(
    client: &reqwest::Client,
    cfg: &UpstreamConfig,
    access_token: &str,
) -> Result<String, OauthError> {
    let url = format!("{}/v1internal:loadCodeAssist", cfg.api_url);
    let response = client
        .post(&url)
        .bearer_auth(access_token)
        .json(&serde_json::json!({ "metadata": { "pluginType": "GEMINI" } }))
        .send()
        .await?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(OauthError::UpstreamStatus(status));
    }
    if !status.is_success() {
        return Err(OauthError::UpstreamStatus(status));
    }

    let parsed: ProjectDiscoveryResponse = response.json().await.map_err(|e| OauthError::Parse {
        message: e.to_string(),
        body: String::new(),
    })?;

    parsed
        .cloudaicompanion_project
        .ok_or_else(|| OauthError::Other {
            message: "discovery response missing cloudaicompanionProject".to_string(),
        })
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
