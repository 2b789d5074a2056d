use axum::{Json, Router, extract::State, routing::get};

use crate::memory::MemoryReport;
use crate::server::router::GatewayState;

pub fn router() -> Router<GatewayState> {
    Router::new().route("/v1/memory", get(memory))
}

async fn memory(State(state): State<GatewayState>) -> Json<MemoryReport> {
    Json(state.memory.report())
}
