mod oauth;
mod rotator;
mod store;

pub use oauth::{fetch_project_id, refresh_access_token};
pub use rotator::{RotatorActor, RotatorHandle, spawn as spawn_rotator};
pub use store::{CredentialStoreActor, CredentialStoreHandle, spawn as spawn_credential_store};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An OAuth2 credential for the antigravity upstream.
///
/// `refresh_token` is the stable identity key; `session_id` is generated at
/// load time and never persisted (see `sessionId` in the data model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub expires_in: i64,
    /// Milliseconds since epoch, of the last refresh.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_true", rename = "hasQuota")]
    pub has_quota: bool,
    #[serde(default, rename = "projectId", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Ephemeral, generated at load, never persisted.
    #[serde(skip, default = "new_session_id")]
    pub session_id: String,
}

fn default_true() -> bool {
    true
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

impl Credential {
    pub fn new(refresh_token: String) -> Self {
        Self {
            refresh_token,
            access_token: None,
            expires_in: 0,
            timestamp: 0,
            enable: true,
            has_quota: true,
            project_id: None,
            email: None,
            session_id: new_session_id(),
        }
    }

    /// `now >= timestamp + (expires_in - 300) * 1000`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        if self.access_token.is_none() {
            return true;
        }
        now_ms >= self.timestamp + (self.expires_in - 300) * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred_with(timestamp: i64, expires_in: i64) -> Credential {
        Credential {
            refresh_token: "rt".to_string(),
            access_token: Some("at".to_string()),
            expires_in,
            timestamp,
            enable: true,
            has_quota: true,
            project_id: None,
            email: None,
            session_id: new_session_id(),
        }
    }

    #[test]
    fn is_expired_matches_predicate() {
        let cred = cred_with(1_000_000, 3600);
        let boundary = 1_000_000 + (3600 - 300) * 1000;
        assert!(!cred.is_expired(boundary - 1));
        assert!(cred.is_expired(boundary));
    }

    #[test]
    fn missing_access_token_is_always_expired() {
        let mut cred = cred_with(0, 3600);
        cred.access_token = None;
        assert!(cred.is_expired(0));
    }

    #[test]
    fn session_id_not_persisted() {
        let cred = Credential::new("rt".to_string());
        let json = serde_json::to_value(&cred).unwrap();
        assert!(json.get("session_id").is_none());
        assert!(json.get("sessionId").is_none());
    }
}
