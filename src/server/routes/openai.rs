//! OpenAI Chat Completions surface: `POST /v1/chat/completions`, `GET /v1/models`.

use std::convert::Infallible;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Json, Router,
    extract::State,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use gateway_schema::openai::{OpenaiChatRequest, OpenaiModelList};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;
use uuid::Uuid;

use crate::server::dispatch;
use crate::server::router::GatewayState;
use crate::server::sse::heartbeat;
use crate::translate::UpstreamDelta;
use crate::translate::models::{KNOWN_MODELS, resolve_model};
use crate::translate::request::build_from_openai;
use crate::translate::response_openai::{OpenaiStreamState, completion_from_unary, final_chunk, stream_chunk};

pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
}

async fn list_models() -> Json<OpenaiModelList> {
    Json(OpenaiModelList::from_model_names(KNOWN_MODELS.iter().copied(), "antigravity".to_string()))
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

async fn chat_completions(State(state): State<GatewayState>, Json(req): Json<OpenaiChatRequest>) -> Response {
    let streaming = req.stream.unwrap_or(false);
    let id = format!("chatcmpl-{}", Uuid::new_v4());
    let created = now_unix();
    let model = resolve_model(&req.model);

    if !streaming {
        let result = dispatch::run_unary(&state, |credential| {
            build_from_openai(&req, &credential.project_id.clone().unwrap_or_default(), &state.signature_caches)
        })
        .await;

        return match result {
            Ok((unary, model)) => {
                let finish_reason = if unary.tool_calls.is_empty() { "stop" } else { "tool_calls" };
                Json(completion_from_unary(&id, created, &model, unary, finish_reason)).into_response()
            }
            Err(err) => err.into_response(),
        };
    }

    let (tx, rx) = mpsc::unbounded_channel::<Result<Event, Infallible>>();
    let heartbeat_secs = state.upstream.heartbeat_interval_secs;

    tokio::spawn(async move {
        let mut stream_state = OpenaiStreamState::new();
        let mut usage = None;
        let mut saw_tool_call = false;

        let result = dispatch::run_stream(
            &state,
            |credential| {
                build_from_openai(&req, &credential.project_id.clone().unwrap_or_default(), &state.signature_caches)
            },
            |delta| {
                match &delta {
                    UpstreamDelta::Usage(u) => usage = Some(*u),
                    UpstreamDelta::ToolCalls(_) => saw_tool_call = true,
                    _ => {}
                }
                if let Some(chunk) = stream_chunk(&mut stream_state, &id, created, &model, &delta) {
                    if let Ok(event) = Event::default().json_data(chunk) {
                        let _ = tx.send(Ok(event));
                    }
                }
            },
        )
        .await;

        if let Err(err) = result {
            warn!(error = %err, "openai stream aborted mid-flight");
        } else {
            let finish_reason = if saw_tool_call { "tool_calls" } else { "stop" };
            let chunk = final_chunk(&id, created, &model, finish_reason, usage);
            if let Ok(event) = Event::default().json_data(chunk) {
                let _ = tx.send(Ok(event));
            }
        }

        let _ = tx.send(Ok(Event::default().data("[DONE]")));
    });

    Sse::new(UnboundedReceiverStream::new(rx))
        .keep_alive(heartbeat(heartbeat_secs))
        .into_response()
}
