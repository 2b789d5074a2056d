use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};

use crate::server::router::GatewayState;

pub fn router() -> Router<GatewayState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime": state.started_at.elapsed().as_secs(),
    }))
}
