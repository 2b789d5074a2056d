//! Per-credential per-model remaining-quota snapshot with TTL.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::fs;
use tracing::warn;

use crate::memory::Pressure;

const READ_TTL_MS: i64 = 5 * 60 * 1000;
const SWEEP_TTL_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelQuota {
    pub remaining: i64,
    pub reset_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaEntry {
    pub last_updated: i64,
    pub models: HashMap<String, ModelQuota>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct QuotaMeta {
    last_cleanup: i64,
    ttl: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct QuotaFile {
    meta: QuotaMeta,
    quotas: HashMap<String, QuotaEntry>,
}

struct Inner {
    path: PathBuf,
    quotas: Mutex<HashMap<String, QuotaEntry>>,
}

#[derive(Clone)]
pub struct QuotaCache {
    inner: Arc<Inner>,
}

impl QuotaCache {
    pub async fn load(path: PathBuf) -> Self {
        let quotas = fs::read_to_string(&path)
            .await
            .ok()
            .and_then(|contents| serde_json::from_str::<QuotaFile>(&contents).ok())
            .map(|file| file.quotas)
            .unwrap_or_default();

        Self {
            inner: Arc::new(Inner {
                path,
                quotas: Mutex::new(quotas),
            }),
        }
    }

    pub fn update(&self, refresh_token: &str, models: HashMap<String, ModelQuota>) {
        let mut quotas = self.inner.quotas.lock().unwrap();
        quotas.insert(
            refresh_token.to_string(),
            QuotaEntry { last_updated: now_ms(), models },
        );
    }

    /// Returns the entry only if it is within the 5-minute read-TTL.
    pub fn get(&self, refresh_token: &str) -> Option<QuotaEntry> {
        let quotas = self.inner.quotas.lock().unwrap();
        let entry = quotas.get(refresh_token)?;
        if now_ms() - entry.last_updated < READ_TTL_MS {
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Drops entries older than the 1-hour sweep TTL and persists.
    pub async fn sweep(&self) {
        let now = now_ms();
        let snapshot = {
            let mut quotas = self.inner.quotas.lock().unwrap();
            quotas.retain(|_, entry| now - entry.last_updated < SWEEP_TTL_MS);
            quotas.clone()
        };
        self.persist(snapshot).await;
    }

    async fn persist(&self, quotas: HashMap<String, QuotaEntry>) {
        let file = QuotaFile {
            meta: QuotaMeta { last_cleanup: now_ms(), ttl: SWEEP_TTL_MS },
            quotas,
        };
        let Some(parent) = self.inner.path.parent() else { return };
        if fs::create_dir_all(parent).await.is_err() {
            warn!(path = %self.inner.path.display(), "failed to create quota store directory");
            return;
        }
        match serde_json::to_vec_pretty(&file) {
            Ok(body) => {
                if let Err(e) = fs::write(&self.inner.path, body).await {
                    warn!(error = %e, "failed to write quota store");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize quota store"),
        }
    }

    /// Subscriber hook for the Memory Regulator: on HIGH prune expired
    /// entries (without waiting for the hourly sweep's persist), on CRITICAL
    /// empty the map outright.
    pub fn on_pressure(&self, pressure: Pressure) {
        match pressure {
            Pressure::High => {
                let now = now_ms();
                let mut quotas = self.inner.quotas.lock().unwrap();
                quotas.retain(|_, entry| now - entry.last_updated < READ_TTL_MS);
            }
            Pressure::Critical => {
                self.inner.quotas.lock().unwrap().clear();
            }
            Pressure::Low | Pressure::Medium => {}
        }
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota_cache() -> QuotaCache {
        QuotaCache {
            inner: Arc::new(Inner {
                path: PathBuf::from("/tmp/does-not-exist-quota-test.json"),
                quotas: Mutex::new(HashMap::new()),
            }),
        }
    }

    #[test]
    fn get_returns_none_for_missing_entry() {
        let cache = quota_cache();
        assert!(cache.get("rt").is_none());
    }

    #[test]
    fn update_then_get_returns_fresh_entry() {
        let cache = quota_cache();
        let mut models = HashMap::new();
        models.insert(
            "gemini-pro".to_string(),
            ModelQuota { remaining: 10, reset_time: "2026-01-01T00:00:00Z".to_string() },
        );
        cache.update("rt", models);
        let entry = cache.get("rt").unwrap();
        assert_eq!(entry.models["gemini-pro"].remaining, 10);
    }

    #[test]
    fn critical_pressure_clears_everything() {
        let cache = quota_cache();
        cache.update("rt", HashMap::new());
        cache.on_pressure(Pressure::Critical);
        assert!(cache.get("rt").is_none());
    }
}
