//! Gemini `generateContent`/`streamGenerateContent` surface.
//!
//! Real Gemini REST paths embed the action as a colon-suffix on the model
//! segment (`/v1beta/models/gemini-2.5-pro:generateContent`), so routing is
//! a single wildcard path split on `:` rather than a typed path param.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use gateway_schema::gemini::{GeminiGenerateContentRequest, GeminiModel, GeminiModelList};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;

use crate::server::dispatch;
use crate::server::router::GatewayState;
use crate::server::sse::heartbeat;
use crate::translate::UpstreamDelta;
use crate::translate::models::{KNOWN_MODELS, resolve_model};
use crate::translate::request::build_from_gemini;
use crate::translate::response_gemini::{body_from_unary, final_chunk, stream_chunk};

pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/v1beta/models", get(list_models))
        .route("/v1beta/models/{*model_action}", get(get_model).post(generate))
}

async fn list_models() -> Json<GeminiModelList> {
    Json(GeminiModelList::from_model_names(KNOWN_MODELS.iter().copied()))
}

async fn get_model(Path(model_action): Path<String>) -> Json<GeminiModel> {
    let (model, _) = split_model_action(&model_action);
    Json(GeminiModel { name: model.clone(), display_name: model, ..Default::default() })
}

fn split_model_action(path: &str) -> (String, String) {
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.split_once(':') {
        Some((model, action)) => (model.to_string(), action.to_string()),
        None => (last.to_string(), String::new()),
    }
}

async fn generate(
    State(state): State<GatewayState>,
    Path(model_action): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<GeminiGenerateContentRequest>,
) -> Response {
    let (raw_model, action) = split_model_action(&model_action);
    let model = resolve_model(&raw_model);
    let streaming = action == "streamGenerateContent" || query.get("alt").map(String::as_str) == Some("sse");

    if !streaming {
        let result = dispatch::run_unary(&state, |credential| {
            build_from_gemini(
                body.clone(),
                &raw_model,
                &credential.project_id.clone().unwrap_or_default(),
                &state.signature_caches,
            )
        })
        .await;

        return match result {
            Ok((unary, _)) => {
                let pass_signature = state.upstream.pass_signature_to_client;
                Json(body_from_unary(unary, &model, pass_signature)).into_response()
            }
            Err(err) => err.into_response(),
        };
    }

    let (tx, rx) = mpsc::unbounded_channel::<Result<Event, Infallible>>();
    let heartbeat_secs = state.upstream.heartbeat_interval_secs;
    let pass_signature = state.upstream.pass_signature_to_client;

    tokio::spawn(async move {
        let mut usage = None;

        let result = dispatch::run_stream(
            &state,
            |credential| {
                build_from_gemini(
                    body.clone(),
                    &raw_model,
                    &credential.project_id.clone().unwrap_or_default(),
                    &state.signature_caches,
                )
            },
            |delta| {
                if let UpstreamDelta::Usage(u) = &delta {
                    usage = Some(*u);
                }
                if let Some(chunk) = stream_chunk(&delta, &model, pass_signature) {
                    if let Ok(event) = Event::default().json_data(chunk) {
                        let _ = tx.send(Ok(event));
                    }
                }
            },
        )
        .await;

        match result {
            Ok(_) => {
                let chunk = final_chunk(&model, usage);
                if let Ok(event) = Event::default().json_data(chunk) {
                    let _ = tx.send(Ok(event));
                }
            }
            Err(err) => {
                warn!(error = %err, "gemini stream aborted mid-flight");
                let payload = serde_json::json!({ "error": { "message": err.to_string() } });
                if let Ok(event) = Event::default().json_data(payload) {
                    let _ = tx.send(Ok(event));
                }
            }
        }
    });

    Sse::new(UnboundedReceiverStream::new(rx))
        .keep_alive(heartbeat(heartbeat_secs))
        .into_response()
}
