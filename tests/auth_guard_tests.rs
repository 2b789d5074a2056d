//! Exercises the API-key guard across a fully wired router: unauthenticated
//! and wrong-key requests to guarded routes are rejected, `/health` bypasses
//! the guard, and the model-list endpoints succeed once authenticated.
//!
//! Keep this file to a single test: `credentials::spawn_rotator` registers a
//! singleton ractor actor by name within a process.

use antigravity_gateway::config::UpstreamConfig;
use antigravity_gateway::credentials;
use antigravity_gateway::memory::MemoryRegulator;
use antigravity_gateway::quota::QuotaCache;
use antigravity_gateway::server::router::{GatewayState, gateway_router};
use antigravity_gateway::signature_cache::SignatureCaches;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

fn unique_temp_path(prefix: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("antigravity-gateway-{prefix}-{}-{}.json", std::process::id(), nanos));
    path
}

async fn build_app() -> axum::Router {
    let store_path = unique_temp_path("auth-guard-store");
    let store = credentials::spawn_credential_store(store_path).await;

    let upstream = UpstreamConfig::default();
    let http = reqwest::Client::builder().build().expect("reqwest client");
    let rotator = credentials::spawn_rotator(store, http, upstream.clone()).await;

    let quota = QuotaCache::load(unique_temp_path("auth-guard-quota")).await;
    let signature_caches = SignatureCaches::default();
    let memory = MemoryRegulator::new(upstream.high_mb);

    let state = GatewayState::new(Arc::from("test-api-key"), rotator, quota, signature_caches, memory, upstream);
    gateway_router(state)
}

#[tokio::test]
async fn guard_rejects_missing_and_wrong_key_but_health_and_authed_routes_pass() {
    let app = build_app().await;

    let no_key = Request::builder()
        .uri("/v1/models")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(no_key).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let wrong_key = Request::builder()
        .uri("/v1/models")
        .header(header::AUTHORIZATION, "Bearer not-the-key")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(wrong_key).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let health = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(health).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let authed = Request::builder()
        .uri("/v1/models")
        .header(header::AUTHORIZATION, "Bearer test-api-key")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(authed).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let unknown = Request::builder()
        .uri("/v1/does-not-exist")
        .header(header::AUTHORIZATION, "Bearer test-api-key")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(unknown).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
