use antigravity_gateway::config::Config;
use antigravity_gateway::credentials;
use antigravity_gateway::memory::MemoryRegulator;
use antigravity_gateway::quota::QuotaCache;
use antigravity_gateway::server::router::{GatewayState, gateway_router};
use antigravity_gateway::signature_cache::SignatureCaches;
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The server binary requires a real config file with a non-empty api_key.
    // (Library code uses `config::CONFIG` which is best-effort and does not validate.)
    let cfg = Config::from_toml();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let http = reqwest::Client::builder()
        .build()
        .expect("failed to build bootstrap reqwest client");

    let store = credentials::spawn_credential_store(PathBuf::from(&cfg.upstream.credential_store_path)).await;
    let rotator = credentials::spawn_rotator(store, http, cfg.upstream.clone()).await;
    let quota = QuotaCache::load(PathBuf::from(&cfg.upstream.quota_store_path)).await;
    let signature_caches = SignatureCaches::default();
    let memory = MemoryRegulator::new(cfg.upstream.high_mb);
    memory.spawn_ticker();
    spawn_pressure_fanout(&memory, quota.clone(), signature_caches.clone());
    spawn_quota_sweep(quota.clone());

    let api_key: Arc<str> = Arc::from(cfg.basic.api_key.clone());
    let state = GatewayState::new(api_key, rotator, quota, signature_caches, memory, cfg.upstream.clone());
    let app = gateway_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server has shut down gracefully.");
    Ok(())
}

/// Pumps Memory Regulator tier changes to the two process-wide caches that
/// subscribe to it: Quota Cache and Signature Caches each get a chance to
/// prune (HIGH) or empty (CRITICAL) themselves.
fn spawn_pressure_fanout(memory: &MemoryRegulator, quota: QuotaCache, signature_caches: SignatureCaches) {
    let mut pressure = memory.subscribe();
    tokio::spawn(async move {
        while pressure.changed().await.is_ok() {
            let tier = *pressure.borrow();
            quota.on_pressure(tier);
            signature_caches.on_pressure(tier);
        }
    });
}

/// Hourly quota-store sweep: drops entries past the 1-hour eviction TTL
/// and persists the result.
fn spawn_quota_sweep(quota: QuotaCache) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            ticker.tick().await;
            quota.sweep().await;
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { /* ... */ },
        _ = terminate => { /* ... */ },
    }
}
