//! Builds antigravity-bound request envelopes from each inbound dialect.
//!
//! Every builder produces a `(AntigravityRequestBody, model)` pair: the
//! envelope is fully formed (system preamble prepended, session id
//! stamped) and ready to POST as-is.

use std::collections::VecDeque;

use chrono::Utc;
use gateway_schema::claude::ClaudeMessagesRequest;
use gateway_schema::gemini::{Content, FunctionDeclaration, GeminiGenerateContentRequest, Part, Tool, ToolConfig};
use gateway_schema::openai::OpenaiChatRequest;
use gateway_schema::{AntigravityRequestBody, AntigravityRequestMeta};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::config::GATEWAY_SYSTEM_PREAMBLE;
use crate::normalize::NormalizedParams;
use crate::signature_cache::SignatureCaches;

use super::models::{is_claude_model, is_enable_thinking, resolve_model};

pub fn build_from_openai(
    req: &OpenaiChatRequest,
    project: &str,
    caches: &SignatureCaches,
) -> AntigravityRequestBody {
    let model = resolve_model(&req.model);
    let thinking = is_enable_thinking(&model);

    let mut system_text = String::new();
    let mut contents = Vec::new();

    for message in &req.messages {
        match message.role.as_str() {
            "system" | "developer" => {
                if let Some(text) = &message.content {
                    if !system_text.is_empty() {
                        system_text.push_str("\n\n");
                    }
                    system_text.push_str(text);
                }
            }
            "tool" => {
                let name = message.name.clone().unwrap_or_default();
                let output = message.content.clone().unwrap_or_default();
                contents.push(Content {
                    role: Some("user".to_string()),
                    parts: vec![Part {
                        function_response: Some(json!({
                            "id": message.tool_call_id,
                            "name": name,
                            "response": { "output": output },
                        })),
                        ..Default::default()
                    }],
                    extra: Default::default(),
                });
            }
            "assistant" => {
                let mut parts = Vec::new();
                if let Some(text) = &message.content {
                    if !text.is_empty() {
                        parts.push(Part { text: Some(text.clone()), ..Default::default() });
                    }
                }
                for call in message.tool_calls.iter().flatten() {
                    let args: Value =
                        serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);
                    parts.push(Part {
                        function_call: Some(json!({
                            "id": call.id,
                            "name": call.function.name,
                            "args": args,
                        })),
                        ..Default::default()
                    });
                }
                contents.push(Content { role: Some("model".to_string()), parts, extra: Default::default() });
            }
            _ => {
                if let Some(text) = &message.content {
                    contents.push(Content {
                        role: Some("user".to_string()),
                        parts: vec![Part { text: Some(text.clone()), ..Default::default() }],
                        extra: Default::default(),
                    });
                }
            }
        }
    }

    thread_function_call_ids(&mut contents);
    if thinking {
        stitch_thought_parts(&mut contents, &model, caches);
    }

    let (tools, tool_config) = convert_tool_defs(req.tools.as_deref(), req.tool_choice.clone());
    let params = NormalizedParams::from_openai(req);
    let generation_config = params.project(is_claude_model(&model) && thinking);

    let request = GeminiGenerateContentRequest {
        contents,
        system_instruction: non_empty_system(&system_text),
        generation_config: Some(generation_config),
        tools,
        tool_config,
        extra: Default::default(),
    };

    wrap_envelope(request, project, &model)
}

pub fn build_from_claude(
    req: &ClaudeMessagesRequest,
    project: &str,
    caches: &SignatureCaches,
) -> AntigravityRequestBody {
    let model = resolve_model(&req.model);
    let thinking = is_enable_thinking(&model);

    let system_text = match &req.system {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n\n"),
        _ => String::new(),
    };

    let mut contents = Vec::new();
    for message in &req.messages {
        let role = if message.role == "assistant" { "model" } else { "user" };
        let mut parts = Vec::new();
        match &message.content {
            Value::String(text) => parts.push(Part { text: Some(text.clone()), ..Default::default() }),
            Value::Array(blocks) => {
                for block in blocks {
                    parts.push(claude_block_to_part(block));
                }
            }
            _ => {}
        }
        contents.push(Content { role: Some(role.to_string()), parts, extra: Default::default() });
    }

    thread_function_call_ids(&mut contents);
    if thinking {
        stitch_thought_parts(&mut contents, &model, caches);
    }

    let (tools, tool_config) = convert_tool_defs(req.tools.as_deref(), req.tool_choice.clone());
    let params = NormalizedParams::from_claude(req);
    let generation_config = params.project(is_claude_model(&model) && thinking);

    let request = GeminiGenerateContentRequest {
        contents,
        system_instruction: non_empty_system(&system_text),
        generation_config: Some(generation_config),
        tools,
        tool_config,
        extra: Default::default(),
    };

    wrap_envelope(request, project, &model)
}

pub fn build_from_gemini(
    mut req: GeminiGenerateContentRequest,
    model: &str,
    project: &str,
    caches: &SignatureCaches,
) -> AntigravityRequestBody {
    let model = resolve_model(model);
    let thinking = is_enable_thinking(&model);

    thread_function_call_ids(&mut req.contents);
    if thinking {
        stitch_thought_parts(&mut req.contents, &model, caches);
    }

    if req.generation_config.is_none() {
        let params = NormalizedParams::from_gemini(&req);
        req.generation_config = Some(params.project(is_claude_model(&model) && thinking));
    }

    wrap_envelope(req, project, &model)
}

fn non_empty_system(text: &str) -> Option<Content> {
    if text.is_empty() {
        None
    } else {
        Some(Content {
            role: Some("user".to_string()),
            parts: vec![Part { text: Some(text.to_string()), ..Default::default() }],
            extra: Default::default(),
        })
    }
}

fn claude_block_to_part(block: &Value) -> Part {
    match block.get("type").and_then(Value::as_str) {
        Some("text") => Part {
            text: block.get("text").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        },
        Some("tool_use") => Part {
            function_call: Some(json!({
                "id": block.get("id"),
                "name": block.get("name"),
                "args": block.get("input").cloned().unwrap_or(Value::Null),
            })),
            ..Default::default()
        },
        Some("tool_result") => Part {
            function_response: Some(json!({
                "id": block.get("tool_use_id"),
                "name": "tool_result",
                "response": { "output": block.get("content").cloned().unwrap_or(Value::Null) },
            })),
            ..Default::default()
        },
        Some("thinking") => Part {
            thought: Some(true),
            text: block.get("thinking").and_then(Value::as_str).map(str::to_string),
            thought_signature: block.get("signature").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        },
        _ => Part::default(),
    }
}

fn convert_tool_defs(
    tools: Option<&[Value]>,
    tool_choice: Option<Value>,
) -> (Option<Vec<Tool>>, Option<ToolConfig>) {
    let Some(tools) = tools.filter(|t| !t.is_empty()) else {
        return (None, None);
    };
    let declarations = tools
        .iter()
        .map(|raw| {
            let (name, description, parameters) = if let Some(func) = raw.get("function") {
                (
                    func.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                    func.get("description").and_then(Value::as_str).unwrap_or_default().to_string(),
                    func.get("parameters").cloned(),
                )
            } else {
                (
                    raw.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                    raw.get("description").and_then(Value::as_str).unwrap_or_default().to_string(),
                    raw.get("input_schema").or_else(|| raw.get("parameters")).cloned(),
                )
            };
            FunctionDeclaration {
                name,
                description,
                behavior: None,
                parameters,
                parameters_json_schema: None,
                response: None,
                response_json_schema: None,
                extra: Default::default(),
            }
        })
        .collect();

    let tool_config = if tool_choice.is_none() {
        Some(ToolConfig {
            function_calling_config: Some(json!({ "mode": "VALIDATED" })),
            retrieval_config: None,
            extra: Default::default(),
        })
    } else {
        None
    };

    (
        Some(vec![Tool { function_declarations: Some(declarations), extra: Default::default() }]),
        tool_config,
    )
}

/// Assigns a fresh id to any tool call lacking one, and threads the same
/// ids onto matching tool results in encounter order.
fn thread_function_call_ids(contents: &mut [Content]) {
    let mut ids = VecDeque::new();
    for content in contents.iter_mut() {
        for part in &mut content.parts {
            if let Some(Value::Object(call)) = &mut part.function_call {
                let id = call
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                call.insert("id".to_string(), Value::String(id.clone()));
                ids.push_back(id);
            }
        }
    }
    for content in contents.iter_mut() {
        for part in &mut content.parts {
            if let Some(Value::Object(resp)) = &mut part.function_response {
                if !resp.contains_key("id") {
                    if let Some(id) = ids.pop_front() {
                        resp.insert("id".to_string(), Value::String(id));
                    }
                }
            }
        }
    }
}

/// Ensures the most recent model turn carries a thought signature
/// somewhere, threading cached signatures in when upstream state was
/// dropped (e.g. a client stripped signatures before replaying history).
fn stitch_thought_parts(contents: &mut [Content], model: &str, caches: &SignatureCaches) {
    for content in contents.iter_mut() {
        if content.role.as_deref() != Some("model") {
            continue;
        }

        let target_idx = content
            .parts
            .iter()
            .position(|p| p.thought == Some(true) && p.thought_signature.is_none());
        let standalone_idx = content.parts.iter().position(|p| {
            p.thought_signature.is_some() && p.text.is_none() && p.function_call.is_none()
        });

        match (target_idx, standalone_idx) {
            (Some(t), Some(s)) => {
                let sig = content.parts[s].thought_signature.take();
                content.parts[t].thought_signature = sig;
                content.parts.remove(s);
            }
            (None, _) => {
                if let Some(cached) = caches.reasoning.get(model) {
                    content.parts.insert(
                        0,
                        Part {
                            thought: Some(true),
                            text: Some(String::new()),
                            thought_signature: Some(cached),
                            ..Default::default()
                        },
                    );
                }
            }
            (Some(_), None) => {}
        }

        loop {
            let standalone_idx = content.parts.iter().position(|p| {
                p.thought_signature.is_some() && p.text.is_none() && p.function_call.is_none()
            });
            let Some(s) = standalone_idx else { break };
            let target = content
                .parts
                .iter()
                .position(|p| p.function_call.is_some() && p.thought_signature.is_none());
            let Some(t) = target else {
                content.parts.remove(s);
                continue;
            };
            let sig = content.parts[s].thought_signature.take();
            content.parts[t].thought_signature = sig;
            content.parts.remove(s);
        }

        for part in &mut content.parts {
            if part.function_call.is_some() && part.thought_signature.is_none() {
                part.thought_signature = caches.tool_call.get(model);
            }
        }
    }
}

fn wrap_envelope(
    request: GeminiGenerateContentRequest,
    project: &str,
    model: &str,
) -> AntigravityRequestBody {
    let request_id = format!("agent/{}/{}", Utc::now().timestamp_millis(), Uuid::new_v4());
    let mut body = AntigravityRequestMeta {
        project: project.to_string(),
        request_id,
        model: model.to_string(),
    }
    .into_request(request);

    body.prepend_system_instruction(GATEWAY_SYSTEM_PREAMBLE);

    if !body.request.extra.contains_key("sessionId") {
        let value = (rand::random::<u64>() % 9_000_000_000_000_000_000) as i64;
        body.request.extra.insert("sessionId".to_string(), Value::String(format!("-{value}")));
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_function_call_ids_assigns_and_reuses() {
        let mut contents = vec![
            Content {
                role: Some("model".to_string()),
                parts: vec![Part {
                    function_call: Some(json!({"name": "lookup", "args": {}})),
                    ..Default::default()
                }],
                extra: Default::default(),
            },
            Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    function_response: Some(json!({"name": "lookup", "response": {"output": "ok"}})),
                    ..Default::default()
                }],
                extra: Default::default(),
            },
        ];
        thread_function_call_ids(&mut contents);

        let call_id = contents[0].parts[0].function_call.as_ref().unwrap()["id"].as_str().unwrap().to_string();
        let resp_id = contents[1].parts[0].function_response.as_ref().unwrap()["id"].as_str().unwrap();
        assert_eq!(call_id, resp_id);
    }

    #[test]
    fn wrap_envelope_prepends_preamble_and_session_id() {
        let request = GeminiGenerateContentRequest {
            contents: vec![],
            system_instruction: None,
            generation_config: None,
            tools: None,
            tool_config: None,
            extra: Default::default(),
        };
        let body = wrap_envelope(request, "proj-1", "gemini-2.5-pro");
        assert!(body.request_id.starts_with("agent/"));
        assert!(body.request.extra.get("sessionId").unwrap().as_str().unwrap().starts_with('-'));
    }
}
