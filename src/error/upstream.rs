//! Structured error shape returned by the antigravity upstream (Google-style
//! `{error:{code,message,status,details}}`), used to classify 4xx/5xx bodies
//! into `ActionForError` for the credential rotator (see `upstream::policy`).

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::upstream::{ActionForError, MappingAction};

#[derive(Debug, Deserialize, Serialize)]
pub struct UpstreamErrorBody {
    #[serde(rename = "error")]
    pub inner: UpstreamErrorObject,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpstreamErrorObject {
    /// Often equals the HTTP status code, e.g. `429`/`404`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Canonical Google-style status name, e.g. `RESOURCE_EXHAUSTED`, `NOT_FOUND`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// May include `google.rpc.ErrorInfo`/`google.rpc.RetryInfo` objects; we only
    /// optionally extract `metadata.quotaResetTimeStamp` for cooldown calculation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Value>>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl UpstreamErrorBody {
    pub fn quota_reset_delay(&self) -> Option<u64> {
        let details = self.inner.details.as_ref()?;

        details
            .iter()
            .filter_map(|detail| {
                detail
                    .get("metadata")
                    .and_then(|m| m.get("quotaResetTimeStamp"))
                    .and_then(Value::as_str)
                    .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            })
            .filter_map(|reset_dt| {
                let reset = reset_dt.with_timezone(&Utc);
                let now = Utc::now();
                let diff_secs = (reset - now).num_seconds();
                (diff_secs > 0).then_some((diff_secs as u64).saturating_add(1))
            })
            .next()
            .or_else(|| {
                details
                    .iter()
                    .any(|detail| {
                        detail.get("reason").and_then(Value::as_str)
                            == Some("MODEL_CAPACITY_EXHAUSTED")
                    })
                    .then_some(60 * 60)
            })
    }
}

impl MappingAction for UpstreamErrorBody {
    fn try_match_rule(&self, status: StatusCode) -> Option<ActionForError> {
        match (status, self) {
            (StatusCode::UNAUTHORIZED, body)
                if body.inner.status.as_deref() == Some("UNAUTHENTICATED") =>
            {
                Some(ActionForError::Invalid)
            }

            (StatusCode::FORBIDDEN, body)
                if body.inner.status.as_deref() == Some("PERMISSION_DENIED") =>
            {
                Some(ActionForError::Ban)
            }

            (StatusCode::NOT_FOUND, body) if body.inner.status.as_deref() == Some("NOT_FOUND") => {
                Some(ActionForError::ModelUnsupported)
            }

            (StatusCode::TOO_MANY_REQUESTS, body)
                if body.inner.status.as_deref() == Some("RESOURCE_EXHAUSTED") =>
            {
                Some(ActionForError::RateLimit(Duration::from_secs(
                    body.quota_reset_delay().unwrap_or(90).max(1),
                )))
            }

            _ => None,
        }
    }

    fn action_from_status(status: StatusCode) -> ActionForError {
        match status {
            StatusCode::UNAUTHORIZED => ActionForError::Invalid,
            StatusCode::FORBIDDEN => ActionForError::None,
            StatusCode::NOT_FOUND => ActionForError::ModelUnsupported,
            StatusCode::TOO_MANY_REQUESTS => ActionForError::RateLimit(Duration::from_secs(60)),
            _ => ActionForError::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_and_map() {
        let e429_1 = UpstreamErrorBody {
            inner: UpstreamErrorObject {
                code: Some(429),
                message: Some("quota".to_string()),
                status: Some("RESOURCE_EXHAUSTED".to_string()),
                details: Some(vec![json!({
                    "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                    "reason": "QUOTA_EXHAUSTED",
                    "domain": "cloudcode-pa.googleapis.com",
                    "metadata": {
                        "model": "gemini-2.5-pro",
                        "quotaResetTimeStamp": "2999-01-01T00:00:00Z"
                    }
                })]),
                extra: BTreeMap::new(),
            },
        };
        assert!(matches!(
            e429_1.try_match_rule(StatusCode::TOO_MANY_REQUESTS),
            Some(ActionForError::RateLimit(_))
        ));

        let e429_2 = UpstreamErrorBody {
            inner: UpstreamErrorObject {
                code: Some(429),
                message: Some("No capacity".to_string()),
                status: Some("RESOURCE_EXHAUSTED".to_string()),
                details: Some(vec![json!({
                    "reason": "MODEL_CAPACITY_EXHAUSTED"
                })]),
                extra: BTreeMap::new(),
            },
        };
        assert_eq!(
            e429_2.try_match_rule(StatusCode::TOO_MANY_REQUESTS),
            Some(ActionForError::RateLimit(Duration::from_secs(60 * 60)))
        );

        let e404 = UpstreamErrorBody {
            inner: UpstreamErrorObject {
                code: Some(404),
                message: Some("Requested entity was not found.".to_string()),
                status: Some("NOT_FOUND".to_string()),
                details: None,
                extra: BTreeMap::new(),
            },
        };
        assert!(matches!(
            e404.try_match_rule(StatusCode::NOT_FOUND),
            Some(ActionForError::ModelUnsupported)
        ));
    }

    #[test]
    fn quota_reset_delay_uses_timestamp() {
        let raw = r#"{
            "error": {
                "code": 429,
                "message": "quota",
                "status": "RESOURCE_EXHAUSTED",
                "details": [
                    { "metadata": { "quotaResetTimeStamp": "2999-01-01T00:00:00Z" } }
                ]
            }
        }"#;

        let parsed = serde_json::from_str::<UpstreamErrorBody>(raw).expect("parse sample");
        assert!(parsed.quota_reset_delay().is_some());
    }
}
