//! Remembers the most recent "thought signature" per model so multi-turn
//! thinking replays re-thread correctly. Keyed by model only (coarse by
//! design): sessions from different users share a slot.

use moka::sync::Cache;
use std::time::Duration;

const CAPACITY: u64 = 16;
const TTL: Duration = Duration::from_secs(30 * 60);

/// One of the two independent per-model signature maps (reasoning, tool-call).
#[derive(Clone)]
pub struct SignatureCache {
    inner: Cache<String, String>,
}

impl SignatureCache {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(CAPACITY)
                .time_to_live(TTL)
                .build(),
        }
    }

    pub fn set(&self, model: &str, signature: String) {
        self.inner.insert(model.to_string(), signature);
    }

    pub fn get(&self, model: &str) -> Option<String> {
        self.inner.get(model)
    }

    /// Drops all entries; invoked under `CRITICAL` memory pressure.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Forces eviction of anything already past its TTL; invoked under `HIGH`
    /// memory pressure. `moka` sweeps lazily, so this nudges it along.
    pub fn sweep_expired(&self) {
        self.inner.run_pending_tasks();
    }
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The reasoning-signature and tool-call-signature caches, wired together so
/// callers (the Request Translator, the Response Translator) only need one handle.
#[derive(Clone, Default)]
pub struct SignatureCaches {
    pub reasoning: SignatureCache,
    pub tool_call: SignatureCache,
}

impl SignatureCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriber hook for the Memory Regulator: prune on `HIGH`,
    /// empty on `CRITICAL`.
    pub fn on_pressure(&self, pressure: crate::memory::Pressure) {
        use crate::memory::Pressure;
        match pressure {
            Pressure::High => {
                self.reasoning.sweep_expired();
                self.tool_call.sweep_expired();
            }
            Pressure::Critical => {
                self.reasoning.clear();
                self.tool_call.clear();
            }
            Pressure::Low | Pressure::Medium => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_value() {
        let cache = SignatureCache::new();
        cache.set("gemini-pro", "sig-1".to_string());
        assert_eq!(cache.get("gemini-pro"), Some("sig-1".to_string()));
    }

    #[test]
    fn missing_model_returns_none() {
        let cache = SignatureCache::new();
        assert_eq!(cache.get("unknown"), None);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = SignatureCache::new();
        cache.set("m", "s".to_string());
        cache.clear();
        assert_eq!(cache.get("m"), None);
    }
}
