use serde::{Deserialize, Serialize};

/// System preamble baked in at build time via `build.rs`, prepended ahead of any
/// caller-supplied system instruction (see `translate::request`).
pub const GATEWAY_SYSTEM_PREAMBLE: &str = env!("GATEWAY_SYSTEM_PREAMBLE");

/// Credential-rotation strategy, hot-swappable via `updateRotationConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    #[default]
    RoundRobin,
    QuotaExhausted,
    RequestCount,
}

/// Upstream + rotation + memory-regulator settings (the `upstream` table in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL of the antigravity upstream (streaming/unary/model-list endpoints hang off this).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// OAuth2 authorization endpoint (interactive capture only; not used by refresh).
    #[serde(default = "default_oauth_auth_url")]
    pub oauth_auth_url: String,

    /// OAuth2 token endpoint used for refresh_token grants.
    #[serde(default = "default_oauth_token_url")]
    pub oauth_token_url: String,

    /// OAuth2 redirect URL used during interactive capture.
    #[serde(default = "default_oauth_redirect_url")]
    pub oauth_redirect_url: String,

    #[serde(default = "default_oauth_client_id")]
    pub oauth_client_id: String,

    #[serde(default = "default_oauth_client_secret")]
    pub oauth_client_secret: String,

    #[serde(default = "default_oauth_scopes")]
    pub oauth_scopes: Vec<String>,

    /// Path to the credential store JSON file.
    #[serde(default = "default_credential_store_path")]
    pub credential_store_path: String,

    /// Path to the quota cache persistence file.
    #[serde(default = "default_quota_store_path")]
    pub quota_store_path: String,

    /// Credential rotation strategy.
    #[serde(default)]
    pub rotation_strategy: RotationStrategy,

    /// Requests per credential before rotating, under `request_count` strategy.
    #[serde(default = "default_request_count_per_token")]
    pub request_count_per_token: u32,

    /// 429-only retry budget for the full upstream call.
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,

    /// Heartbeat interval for open SSE streams, in seconds.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// `highMB` threshold driving the Memory Regulator's four pressure tiers.
    #[serde(default = "default_high_mb")]
    pub high_mb: u64,

    /// Whether `thoughtSignature`/`signature` fields are forwarded to callers.
    #[serde(default = "default_pass_signature_to_client")]
    pub pass_signature_to_client: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            oauth_auth_url: default_oauth_auth_url(),
            oauth_token_url: default_oauth_token_url(),
            oauth_redirect_url: default_oauth_redirect_url(),
            oauth_client_id: default_oauth_client_id(),
            oauth_client_secret: default_oauth_client_secret(),
            oauth_scopes: default_oauth_scopes(),
            credential_store_path: default_credential_store_path(),
            quota_store_path: default_quota_store_path(),
            rotation_strategy: RotationStrategy::default(),
            request_count_per_token: default_request_count_per_token(),
            retry_times: default_retry_times(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            high_mb: default_high_mb(),
            pass_signature_to_client: default_pass_signature_to_client(),
        }
    }
}

fn default_api_url() -> String {
    "https://daily-cloudcode-pa.sandbox.googleapis.com".to_string()
}

fn default_oauth_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_oauth_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_oauth_redirect_url() -> String {
    "http://localhost:8188".to_string()
}

fn default_oauth_client_id() -> String {
    "1071006060591-tmhssin2h21lcre235vtolojh4g403ep.apps.googleusercontent.com".to_string()
}

fn default_oauth_client_secret() -> String {
    "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".to_string()
}

fn default_oauth_scopes() -> Vec<String> {
    [
        "https://www.googleapis.com/auth/cloud-platform",
        "https://www.googleapis.com/auth/userinfo.email",
        "https://www.googleapis.com/auth/userinfo.profile",
        "https://www.googleapis.com/auth/cclog",
        "https://www.googleapis.com/auth/experimentsandconfigs",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_credential_store_path() -> String {
    "data/accounts.json".to_string()
}

fn default_quota_store_path() -> String {
    "data/quotas.json".to_string()
}

fn default_request_count_per_token() -> u32 {
    20
}

fn default_retry_times() -> u32 {
    3
}

fn default_heartbeat_interval_secs() -> u64 {
    15
}

fn default_high_mb() -> u64 {
    512
}

fn default_pass_signature_to_client() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = UpstreamConfig::default();
        assert_eq!(cfg.rotation_strategy, RotationStrategy::RoundRobin);
        assert_eq!(cfg.retry_times, 3);
        assert_eq!(cfg.heartbeat_interval_secs, 15);
        assert!(cfg.oauth_client_id.ends_with(".apps.googleusercontent.com"));
        assert_eq!(cfg.oauth_scopes.len(), 5);
    }
}
