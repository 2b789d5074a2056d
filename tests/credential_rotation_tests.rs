//! A rotator spawned against an empty credential store has nothing to hand
//! out. Keep this file to a single test: `credentials::spawn_rotator`
//! registers a singleton ractor actor by name within a process.

use antigravity_gateway::config::UpstreamConfig;
use antigravity_gateway::credentials;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_path(prefix: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("antigravity-gateway-{prefix}-{}-{}.json", std::process::id(), nanos));
    path
}

#[tokio::test]
async fn rotator_get_token_returns_none_with_empty_store() {
    let store = credentials::spawn_credential_store(unique_temp_path("rotation-baseline-store")).await;
    let http = reqwest::Client::builder().build().expect("reqwest client");
    let rotator = credentials::spawn_rotator(store, http, UpstreamConfig::default()).await;

    let token = rotator.get_token().await.expect("rotator RPC should succeed");
    assert!(token.is_none());
}
