//! Checks that the OpenAI and Gemini model-discovery endpoints advertise the
//! known antigravity-backed models, and that the OpenAI list is keyed the way
//! OpenAI clients expect (`data[].id`, `owned_by`).
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
    body::{Body, to_bytes},
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

#[tokio::test]
async fn model_lists_advertise_known_models_in_each_dialects_shape() {
    let store = credentials::spawn_credential_store(unique_temp_path("model-list-store")).await;
    let upstream = UpstreamConfig::default();
    let http = reqwest::Client::builder().build().expect("reqwest client");
    let rotator = credentials::spawn_rotator(store, http, upstream.clone()).await;
    let quota = QuotaCache::load(unique_temp_path("model-list-quota")).await;
    let state = GatewayState::new(
        Arc::from("test-api-key"),
        rotator,
        quota,
        SignatureCaches::default(),
        MemoryRegulator::new(upstream.high_mb),
        upstream,
    );
    let app = gateway_router(state);

    let req = Request::builder()
        .uri("/v1/models")
        .header(header::AUTHORIZATION, "Bearer test-api-key")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let ids: Vec<&str> = value["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|m| m["id"].as_str().expect("id"))
        .collect();
    assert!(ids.contains(&"gemini-2.5-pro"));
    assert!(ids.contains(&"claude-sonnet-4-5"));
    assert_eq!(value["data"][0]["owned_by"], "antigravity");

    let req = Request::builder()
        .uri("/v1beta/models")
        .header(header::AUTHORIZATION, "Bearer test-api-key")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let names: Vec<&str> = value["models"]
        .as_array()
        .expect("models array")
        .iter()
        .map(|m| m["name"].as_str().expect("name"))
        .collect();
    assert!(names.contains(&"gemini-2.5-flash"));
    assert!(names.contains(&"claude-sonnet-4-5-thinking"));
}
