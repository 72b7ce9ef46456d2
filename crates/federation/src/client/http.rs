//! URL transport: streaming-HTTP first, falling back to legacy SSE on
//! failure (spec §4.4 Connect, §8 scenario S5), grounded in the same
//! Streamable-HTTP + legacy-SSE shape that
//! `examples/other_examples/..._server-transport.rs.rs` implements
//! server-side.

use super::{ExternalClient, ResourceInfo};
use crate::error::FederationError;
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use photon_core::descriptor::{MethodDescriptor, Visibility};
use photon_core::InvocationContext;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Spec §5 "External connect: 10 s".
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportMode {
    StreamingHttp,
    LegacySse,
}

struct Pending {
    responses: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
}

pub struct HttpExternalClient {
    http: reqwest::Client,
    post_url: String,
    mode: TransportMode,
    next_id: AtomicU64,
    pending: Arc<Pending>,
}

impl HttpExternalClient {
    /// Attempt streaming-HTTP against `url` first; on a non-2xx response or
    /// a connect failure, fall back to the legacy SSE handshake (GET `url`,
    /// read the first `endpoint` event for the POST target).
    pub async fn connect(url: &str) -> Result<Self, FederationError> {
        let http = reqwest::Client::builder()
            .timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FederationError::ConnectFailed(e.to_string()))?;

        match Self::try_streaming_http(&http, url).await {
            Ok(client) => Ok(client),
            Err(_) => Self::connect_legacy_sse(http, url).await,
        }
    }

    async fn try_streaming_http(http: &reqwest::Client, url: &str) -> Result<Self, FederationError> {
        let response = tokio::time::timeout(
            CONNECT_TIMEOUT,
            http.post(url).json(&jsonrpc_request(0, "initialize", serde_json::json!({}))).send(),
        )
        .await
        .map_err(|_| FederationError::ConnectTimeout(CONNECT_TIMEOUT))?
        .map_err(|e| FederationError::ConnectFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FederationError::ConnectFailed(format!("status {}", response.status())));
        }

        Ok(Self {
            http: http.clone(),
            post_url: url.to_string(),
            mode: TransportMode::StreamingHttp,
            next_id: AtomicU64::new(1),
            pending: Arc::new(Pending { responses: Mutex::new(HashMap::new()) }),
        })
    }

    async fn connect_legacy_sse(http: reqwest::Client, url: &str) -> Result<Self, FederationError> {
        let response = tokio::time::timeout(CONNECT_TIMEOUT, http.get(url).send())
            .await
            .map_err(|_| FederationError::ConnectTimeout(CONNECT_TIMEOUT))?
            .map_err(|e| FederationError::ConnectFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FederationError::ConnectFailed(format!("legacy SSE status {}", response.status())));
        }

        let mut stream = crate::sse::SseLineStream::new(response.bytes_stream());
        let first = tokio::time::timeout(CONNECT_TIMEOUT, stream.next_frame())
            .await
            .map_err(|_| FederationError::ConnectTimeout(CONNECT_TIMEOUT))?
            .ok_or_else(|| FederationError::ConnectFailed("legacy SSE stream closed before endpoint event".into()))?;

        let endpoint_data: Value = serde_json::from_str(&first.data)
            .map_err(|e| FederationError::ConnectFailed(format!("malformed endpoint event: {e}")))?;
        let post_url = endpoint_data
            .get("endpoint")
            .and_then(Value::as_str)
            .ok_or_else(|| FederationError::ConnectFailed("endpoint event missing 'endpoint'".into()))?
            .to_string();

        let pending = Arc::new(Pending { responses: Mutex::new(HashMap::new()) });
        let reader_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(frame) = stream.next_frame().await {
                if let Ok(value) = serde_json::from_str::<Value>(&frame.data) {
                    demux(&reader_pending, value);
                }
            }
        });

        Ok(Self { http, post_url, mode: TransportMode::LegacySse, next_id: AtomicU64::new(1), pending })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, FederationError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = jsonrpc_request(id, method, params);

        match self.mode {
            TransportMode::StreamingHttp => {
                let response = self
                    .http
                    .post(&self.post_url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| FederationError::Upstream(e.to_string()))?;
                let value: Value = response.json().await.map_err(|e| FederationError::Upstream(e.to_string()))?;
                Ok(value.get("result").cloned().unwrap_or(Value::Null))
            }
            TransportMode::LegacySse => {
                let (tx, rx) = oneshot::channel();
                self.pending.responses.lock().insert(id, tx);
                self.http
                    .post(&self.post_url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| FederationError::Upstream(e.to_string()))?;
                rx.await.map_err(|_| FederationError::Upstream("no reply on SSE stream".into()))
            }
        }
    }
}

fn demux(pending: &Arc<Pending>, value: Value) {
    let Some(id) = value.get("id").and_then(Value::as_u64) else { return };
    if let Some(tx) = pending.responses.lock().remove(&id) {
        let _ = tx.send(value.get("result").cloned().unwrap_or(Value::Null));
    }
}

fn jsonrpc_request(id: u64, method: &str, params: Value) -> Value {
    serde_json::json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

#[async_trait]
impl ExternalClient for HttpExternalClient {
    async fn list_tools(&self) -> Result<Vec<MethodDescriptor>, FederationError> {
        let result = self.request("tools/list", serde_json::json!({})).await?;
        let tools = result.get("tools").cloned().unwrap_or(Value::Array(vec![]));
        let raw: Vec<RawTool> =
            serde_json::from_value(tools).map_err(|e| FederationError::Upstream(e.to_string()))?;
        Ok(raw
            .into_iter()
            .map(|t| MethodDescriptor {
                name: t.name,
                input_schema: t.input_schema,
                output_format: None,
                layout_hints: Value::Null,
                button_label: None,
                icon: None,
                linked_ui: None,
                visibility: vec![Visibility::Model, Visibility::App],
                autorun: false,
                is_test: false,
                is_template: false,
            })
            .collect())
    }

    async fn list_resources(&self) -> Result<Vec<ResourceInfo>, FederationError> {
        let result = self.request("resources/list", serde_json::json!({})).await?;
        let Some(resources) = result.get("resources") else { return Ok(Vec::new()) };
        let raw: Vec<RawResource> =
            serde_json::from_value(resources.clone()).map_err(|e| FederationError::Upstream(e.to_string()))?;
        Ok(raw.into_iter().map(|r| ResourceInfo { uri: r.uri, mime_type: r.mime_type }).collect())
    }

    async fn call_tool(&self, method: &str, args: Value, ctx: InvocationContext) -> Result<Value, FederationError> {
        // No-buffering forwarding (spec §4.4): streaming-HTTP mode has no
        // separate progress channel here (the single POST response carries
        // the terminal result), so only the result is surfaced; the legacy
        // path's SSE frames would carry intermediate `notifications/*`
        // messages which a caller wiring this client into a session can
        // forward by polling `ctx.events` — left to the transport layer to
        // connect if the upstream ever emits them, since this client has no
        // session to address them through.
        let _ = &ctx;
        self.request("tools/call", serde_json::json!({ "name": method, "arguments": args })).await
    }

    async fn close(&self) -> Result<(), FederationError> {
        Ok(())
    }
}

#[derive(Debug, serde::Deserialize)]
struct RawTool {
    name: String,
    #[serde(default, rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Debug, serde::Deserialize)]
struct RawResource {
    uri: String,
    #[serde(default, rename = "mimeType")]
    mime_type: Option<String>,
}
