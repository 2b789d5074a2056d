//! Anthropic Messages surface: `POST /v1/messages`.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::State,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::post,
};
use gateway_schema::claude::{ClaudeMessagesRequest, ClaudeStreamEvent};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;
use uuid::Uuid;

use crate::server::dispatch;
use crate::server::router::GatewayState;
use crate::server::sse::heartbeat;
use crate::translate::models::resolve_model;
use crate::translate::request::build_from_claude;
use crate::translate::response_claude::{ClaudeStreamState, response_from_unary};

pub fn router() -> Router<GatewayState> {
    Router::new().route("/v1/messages", post(messages))
}

fn to_event(event: ClaudeStreamEvent) -> Option<Event> {
    let name = event.event_name();
    Event::default().event(name).json_data(event).ok()
}

async fn messages(State(state): State<GatewayState>, Json(req): Json<ClaudeMessagesRequest>) -> Response {
    let streaming = req.stream.unwrap_or(false);
    let id = format!("msg_{}", Uuid::new_v4());
    let model = resolve_model(&req.model);
    let pass_signature = state.upstream.pass_signature_to_client;

    if !streaming {
        let result = dispatch::run_unary(&state, |credential| {
            build_from_claude(&req, &credential.project_id.clone().unwrap_or_default(), &state.signature_caches)
        })
        .await;

        return match result {
            Ok((unary, model)) => {
                let stop_reason = if unary.tool_calls.is_empty() { "end_turn" } else { "tool_use" };
                Json(response_from_unary(id, model, unary, stop_reason, pass_signature)).into_response()
            }
            Err(err) => err.into_response(),
        };
    }

    let (tx, rx) = mpsc::unbounded_channel::<Result<Event, Infallible>>();
    let heartbeat_secs = state.upstream.heartbeat_interval_secs;

    tokio::spawn(async move {
        let mut stream_state = ClaudeStreamState::new();
        let mut usage = None;
        let mut saw_tool_call = false;
        let message = json!({
            "id": id,
            "type": "message",
            "role": "assistant",
            "model": model,
            "content": [],
            "stop_reason": null,
            "usage": { "input_tokens": 0, "output_tokens": 0 },
        });

        let result = dispatch::run_stream(
            &state,
            |credential| {
                build_from_claude(&req, &credential.project_id.clone().unwrap_or_default(), &state.signature_caches)
            },
            |delta| {
                match &delta {
                    crate::translate::UpstreamDelta::Usage(u) => usage = Some(*u),
                    crate::translate::UpstreamDelta::ToolCalls(_) => saw_tool_call = true,
                    _ => {}
                }
                for event in stream_state.push(&delta, pass_signature, message.clone()) {
                    if let Some(event) = to_event(event) {
                        let _ = tx.send(Ok(event));
                    }
                }
            },
        )
        .await;

        let stop_reason = match &result {
            Ok(_) => {
                if saw_tool_call {
                    "tool_use"
                } else {
                    "end_turn"
                }
            }
            Err(err) => {
                warn!(error = %err, "claude stream aborted mid-flight");
                let payload = json!({ "type": "error", "error": { "message": err.to_string() } });
                if let Ok(event) = Event::default().event("error").json_data(payload) {
                    let _ = tx.send(Ok(event));
                }
                "error"
            }
        };

        for event in stream_state.finish(stop_reason, usage) {
            if let Some(event) = to_event(event) {
                let _ = tx.send(Ok(event));
            }
        }
    });

    Sse::new(UnboundedReceiverStream::new(rx))
        .keep_alive(heartbeat(heartbeat_secs))
        .into_response()
}
