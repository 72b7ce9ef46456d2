//! JSON-RPC method dispatch for the streaming endpoint (spec §4.2 "POST
//! dispatch"), mirroring the `handle_mcp_post` method-match in
//! `examples/other_examples/..._server-transport.rs.rs`.

use crate::state::AppState;
use photon_core::{
    CancellationToken, ControlPlaneError, InvocationContext, InvocationEvent, JsonRpcRequest, JsonRpcResponse,
    SessionId, ViewState,
};
use photon_subscribe::Backend;
use serde_json::Value;

pub async fn dispatch<B: Backend>(
    state: &AppState<B>,
    session_id: &SessionId,
    req: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    state.sessions.touch(session_id);
    let is_notification = req.is_notification();

    match req.method.as_str() {
        "initialize" => {
            state.sessions.initialize(session_id);
            Some(JsonRpcResponse::success(req.id, initialize_result()))
        }
        "notifications/initialized" => None,
        "ping" => maybe_respond(is_notification, req.id, serde_json::json!({})),
        "tools/list" => Some(JsonRpcResponse::success(req.id, tools_list(state).await)),
        "configuration/list" => Some(JsonRpcResponse::success(req.id, configuration_list(state))),
        "tools/call" => Some(handle_tools_call(state, session_id, req).await),
        "resources/read" => Some(handle_resources_read(state, req).await),
        "prompts/get" => Some(handle_prompts_get(state, req).await),
        "$/cancelRequest" => {
            handle_cancel(state, session_id, &req.params);
            None
        }
        "notifications/observe" => {
            handle_observe(state, session_id, &req.params).await;
            None
        }
        "elicitation/respond" => {
            handle_elicitation_respond(state, session_id, &req);
            None
        }
        other => {
            if is_notification {
                None
            } else {
                Some(JsonRpcResponse::error(
                    req.id,
                    -32601,
                    format!("method not found: {other}"),
                    None,
                ))
            }
        }
    }
}

fn maybe_respond(is_notification: bool, id: Option<Value>, result: Value) -> Option<JsonRpcResponse> {
    if is_notification {
        None
    } else {
        Some(JsonRpcResponse::success(id, result))
    }
}

fn initialize_result() -> Value {
    serde_json::json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": { "listChanged": true },
            "elicitation": {},
            "experimental": { "ui": {} }
        },
        "serverInfo": { "name": "photond", "version": env!("CARGO_PKG_VERSION") }
    })
}

async fn tools_list<B: Backend>(state: &AppState<B>) -> Value {
    let mut tools = Vec::new();
    for descriptor in state.registry.descriptors() {
        if !descriptor.state.is_ready() {
            continue;
        }
        for method in &descriptor.methods {
            if !method.is_auto_invocable() {
                continue;
            }
            tools.push(serde_json::json!({
                "name": format!("{}.{}", descriptor.name, method.name),
                "description": descriptor.metadata.description,
                "inputSchema": method.input_schema,
                "outputFormat": method.output_format,
                "visibility": method.visibility,
                "autorun": method.autorun,
            }));
        }
    }
    for descriptor in state.federation.descriptors() {
        if !descriptor.connected {
            continue;
        }
        for method in &descriptor.methods {
            tools.push(serde_json::json!({
                "name": format!("{}.{}", descriptor.name, method.name),
                "inputSchema": method.input_schema,
            }));
        }
    }
    serde_json::json!({ "tools": tools })
}

/// Non-ready photons, surfaced separately so a machine client can drive the
/// configuration flow without them cluttering `tools/list` (spec §4.2).
fn configuration_list<B: Backend>(state: &AppState<B>) -> Value {
    let pending: Vec<Value> = state
        .registry
        .descriptors()
        .into_iter()
        .filter(|d| !d.state.is_ready())
        .map(|d| {
            serde_json::json!({
                "name": d.name,
                "state": d.state,
                "configParams": d.config_params,
            })
        })
        .collect();
    serde_json::json!({ "photons": pending })
}

fn split_qualified_method(name: &str) -> Option<(&str, &str)> {
    name.split_once('.')
}

async fn handle_tools_call<B: Backend>(state: &AppState<B>, session_id: &SessionId, req: JsonRpcRequest) -> JsonRpcResponse {
    let id = req.id.clone();
    let Some(name) = req.params.get("name").and_then(Value::as_str) else {
        return JsonRpcResponse::error(id, -32602, "missing 'name' parameter", None);
    };
    let Some((owner, method)) = split_qualified_method(name) else {
        return JsonRpcResponse::error(id, -32602, format!("'{name}' is not a qualified method name"), None);
    };
    let args = req.params.get("arguments").cloned().unwrap_or(Value::Null);

    let token = CancellationToken::new();
    if let Some(request_id) = &id {
        state.cancellations.register(session_id, request_id, token.clone());
    }

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(64);
    let (ask_tx, mut ask_rx) = tokio::sync::mpsc::channel(4);
    let ctx = InvocationContext::new(events_tx, Some(ask_tx), token);

    // The channel this session is currently viewing, if any: yielded events
    // are forwarded there in addition to the session's own SSE stream
    // (spec §4.2 "the call's yield sink forwards to both the session's SSE
    // stream and the associated channel ring").
    let channel_key = state.sessions.view(session_id).map(|view| view.channel_key());

    let forward_session = session_id.clone();
    let forward_sessions = std::sync::Arc::clone(&state.sessions);
    let forward_subscriptions = std::sync::Arc::clone(&state.subscriptions);
    let forward_channel = channel_key;
    let forwarder = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let yielded = match &event {
                InvocationEvent::Progress(_) => Some("progress"),
                InvocationEvent::Status(_) => Some("status"),
                InvocationEvent::Log(_) => Some("log"),
                InvocationEvent::Result(_) | InvocationEvent::Error(_) | InvocationEvent::Cancelled => None,
            };
            let body = match event {
                InvocationEvent::Progress(v) => serde_json::json!({"type": "progress", "value": v}),
                InvocationEvent::Status(v) => serde_json::json!({"type": "status", "value": v}),
                InvocationEvent::Log(v) => serde_json::json!({"type": "log", "value": v}),
                InvocationEvent::Result(v) => serde_json::json!({"type": "result", "value": v}),
                InvocationEvent::Error(e) => serde_json::json!({"type": "error", "kind": e.kind_name()}),
                InvocationEvent::Cancelled => serde_json::json!({"type": "cancelled"}),
            };
            if let (Some(kind), Some(channel)) = (yielded, &forward_channel) {
                let params = serde_json::json!({"kind": kind, "body": body});
                forward_subscriptions.publish(channel, "channel-event", params).await;
            }
            forward_sessions.push(&forward_session, serde_json::json!({"method": "notifications/progress", "params": body}));
        }
    });

    let elicitation_session = session_id.clone();
    let elicitation_sessions = std::sync::Arc::clone(&state.sessions);
    let elicitation_table = state.elicitations.clone();
    let asker = tokio::spawn(async move {
        let mut counter: u64 = 0;
        while let Some(request) = ask_rx.recv().await {
            counter += 1;
            let request_id = format!("elicit-{counter}");
            let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
            elicitation_table.register(elicitation_session.clone(), request_id.clone(), reply_tx);
            elicitation_sessions.push(
                &elicitation_session,
                serde_json::json!({
                    "method": "elicitation/create",
                    "params": { "requestId": request_id, "prompt": request.prompt },
                }),
            );
            if let Ok(answer) = reply_rx.await {
                let _ = request.reply.send(answer);
            }
        }
    });

    let result = route_invoke(state, owner, method, args, ctx).await;

    drop(forwarder);
    drop(asker);
    if let Some(request_id) = &id {
        state.cancellations.unregister(session_id, request_id);
    }

    match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(err) => JsonRpcResponse::from_control_plane_error(id, &err),
    }
}

async fn route_invoke<B: Backend>(
    state: &AppState<B>,
    owner: &str,
    method: &str,
    args: Value,
    ctx: InvocationContext,
) -> Result<Value, ControlPlaneError> {
    if let Some(descriptor) = state.registry.find_by_name(owner) {
        return state.registry.invoke(&descriptor.id, method, args, ctx).await;
    }
    if state.federation.find_by_name(owner).is_some() {
        return state.federation.invoke(owner, method, args, ctx).await;
    }
    Err(ControlPlaneError::NotFound(owner.to_string()))
}

async fn handle_resources_read<B: Backend>(state: &AppState<B>, req: JsonRpcRequest) -> JsonRpcResponse {
    let id = req.id.clone();
    let Some(name) = req.params.get("photon").and_then(Value::as_str) else {
        return JsonRpcResponse::error(id, -32602, "missing 'photon' parameter", None);
    };
    match state.registry.find_by_name(name) {
        Some(descriptor) => JsonRpcResponse::success(
            id,
            serde_json::json!({ "resourceCount": descriptor.resource_count, "promptCount": descriptor.prompt_count }),
        ),
        None => JsonRpcResponse::from_control_plane_error(id, &ControlPlaneError::NotFound(name.to_string())),
    }
}

async fn handle_prompts_get<B: Backend>(state: &AppState<B>, req: JsonRpcRequest) -> JsonRpcResponse {
    let id = req.id.clone();
    let Some(name) = req.params.get("photon").and_then(Value::as_str) else {
        return JsonRpcResponse::error(id, -32602, "missing 'photon' parameter", None);
    };
    match state.registry.find_by_name(name) {
        Some(descriptor) => JsonRpcResponse::success(id, serde_json::json!({ "promptCount": descriptor.prompt_count })),
        None => JsonRpcResponse::from_control_plane_error(id, &ControlPlaneError::NotFound(name.to_string())),
    }
}

fn handle_cancel<B: Backend>(state: &AppState<B>, session_id: &SessionId, params: &Value) {
    if let Some(request_id) = params.get("id") {
        state.cancellations.cancel(session_id, request_id);
    }
}

async fn handle_observe<B: Backend>(state: &AppState<B>, session_id: &SessionId, params: &Value) {
    let Some(photon_id) = params.get("photonId").and_then(Value::as_str) else { return };
    let Some(item_id) = params.get("itemId").and_then(Value::as_str) else { return };
    let last_event_id = params.get("lastEventId").and_then(Value::as_u64);
    let view = ViewState { photon_id: photon_id.to_string(), item_id: item_id.to_string() };
    state.sessions.set_view(session_id, view.clone());
    state.subscriptions.observe(session_id.clone(), view, last_event_id).await;
}

fn handle_elicitation_respond<B: Backend>(state: &AppState<B>, session_id: &SessionId, req: &JsonRpcRequest) {
    let Some(request_id) = req.params.get("requestId").and_then(Value::as_str) else { return };
    let answer = req.params.get("answer").cloned().unwrap_or(Value::Null);
    state.elicitations.resolve(session_id, request_id, answer);
}
