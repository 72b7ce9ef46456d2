//! Router construction for the streaming endpoint: a single `/mcp` path
//! accepting POST (JSON-RPC) and GET (SSE), plus health checks — the same
//! shape as `create_router` in
//! `examples/other_examples/..._server-transport.rs.rs`, generalized to
//! the photon/federation dispatch surface (spec §4.2, §6).

use crate::dispatch::dispatch;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use photon_core::{JsonRpcRequest, SessionId};
use photon_subscribe::Backend;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

pub fn build_router<B: Backend>(state: AppState<B>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/mcp", post(handle_post::<B>).get(handle_get::<B>))
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "service": "photond" }))
}

fn resolve_session<B: Backend>(state: &AppState<B>, query: &SessionQuery) -> SessionId {
    if let Some(raw) = &query.session_id {
        let id = SessionId::new(raw.clone());
        if state.sessions.exists(&id) {
            return id;
        }
        state.sessions.create(id)
    } else {
        state.sessions.create(SessionId::new(new_session_token()))
    }
}

fn new_session_token() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("sess-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
}

async fn handle_post<B: Backend>(
    State(state): State<AppState<B>>,
    Query(query): Query<SessionQuery>,
    Json(req): Json<JsonRpcRequest>,
) -> Response {
    let session_id = resolve_session(&state, &query);
    let is_notification = req.is_notification();

    match dispatch(&state, &session_id, req).await {
        Some(response) => {
            let mut res = Json(response).into_response();
            if let Ok(header_value) = axum::http::HeaderValue::from_str(session_id.as_str()) {
                res.headers_mut().insert("Mcp-Session-Id", header_value);
            }
            res
        }
        None if is_notification => StatusCode::ACCEPTED.into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn handle_get<B: Backend>(
    State(state): State<AppState<B>>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> impl IntoResponse {
    let last_event_id: Option<u64> =
        headers.get("Last-Event-ID").and_then(|v| v.to_str().ok()).and_then(|s| s.parse().ok());

    let session_id = resolve_session(&state, &query);

    if let (Some(last_event_id), Some(view)) = (last_event_id, state.sessions.view(&session_id)) {
        state.subscriptions.observe(session_id.clone(), view, Some(last_event_id)).await;
    }

    let receiver = state.sessions.subscribe(&session_id);
    let stream = build_event_stream(receiver);

    (
        [("X-Accel-Buffering", "no"), ("Cache-Control", "no-cache, no-store, must-revalidate")],
        Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping")),
    )
}

fn build_event_stream(
    receiver: Option<tokio::sync::broadcast::Receiver<crate::session::OutboundEvent>>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let Some(receiver) = receiver else {
        return stream::iter(Vec::<Result<Event, Infallible>>::new()).left_stream();
    };
    BroadcastStream::new(receiver)
        .filter_map(|result| async move {
            match result {
                Ok(event) => Some(Ok(Event::default().id(event.id.to_string()).event("message").data(event.body.to_string()))),
                Err(_lagged) => None,
            }
        })
        .right_stream()
}
