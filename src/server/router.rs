use crate::config::UpstreamConfig;
use crate::credentials::RotatorHandle;
use crate::memory::MemoryRegulator;
use crate::quota::QuotaCache;
use crate::server::guards::auth::RequireKeyAuth;
use crate::server::routes::{claude, gemini, health, memory, openai};
use crate::signature_cache::SignatureCaches;
use crate::upstream::UpstreamEndpoints;

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, StatusCode, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::Response,
};
use base64::Engine as _;
use rand::RngCore;
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use url::Url;

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

/// Shared state for every request handler: the single upstream HTTP
/// client, the credential rotator, and the regulator/cache handles each
/// translation step consults.
#[derive(Clone)]
pub struct GatewayState {
    pub api_key: Arc<str>,
    pub client: reqwest::Client,
    pub rotator: RotatorHandle,
    pub quota: QuotaCache,
    pub signature_caches: SignatureCaches,
    pub memory: MemoryRegulator,
    pub endpoints: UpstreamEndpoints,
    pub upstream: UpstreamConfig,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(
        api_key: Arc<str>,
        rotator: RotatorHandle,
        quota: QuotaCache,
        signature_caches: SignatureCaches,
        memory: MemoryRegulator,
        upstream: UpstreamConfig,
    ) -> Self {
        let base = Url::parse(&upstream.api_url).expect("invalid upstream.api_url");
        let endpoints = UpstreamEndpoints::new(&base);

        let client = reqwest::Client::builder()
            .user_agent(crate::upstream::ANTIGRAVITY_USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(10 * 60))
            .http2_adaptive_window(true)
            .build()
            .expect("failed to build reqwest client");

        Self {
            api_key,
            client,
            rotator,
            quota,
            signature_caches,
            memory,
            endpoints,
            upstream,
            started_at: Instant::now(),
        }
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    let path = uri.path();
    let protocol = format_http_version(version);

    // For SSE responses, `latency_ms` is time-to-first-byte, not full-stream duration.
    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(), request_id, method.as_str(), protocol, path, latency_ms, user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(), request_id, method.as_str(), protocol, path, latency_ms, user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(), request_id, method.as_str(), protocol, path, latency_ms, user_agent
        );
    }

    resp
}

pub fn gateway_router(state: GatewayState) -> Router {
    let guarded = Router::new()
        .merge(openai::router())
        .merge(gemini::router())
        .merge(claude::router())
        .merge(memory::router())
        .layer(middleware::from_extractor_with_state::<RequireKeyAuth, _>(state.clone()));

    let open = Router::new().merge(health::router());

    Router::new()
        .merge(open)
        .merge(guarded)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
