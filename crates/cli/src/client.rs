//! HTTP client for the `photond` streamable transport (spec §4.2, §6).
//!
//! `photon-cli` is a thin smoke-test client: unlike the daemon's own
//! `/mcp` GET stream, it never opens an SSE connection — `tools/call`
//! issues one POST and reads the single JSON-RPC response, matching the
//! scope SPEC_FULL.md carves out for this crate (status / `tools/list` /
//! `tools/call`, not interactive streaming).

use std::time::Duration;

use photon_core::rpc::JSONRPC_VERSION;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

/// Timeout for a single request/response round trip.
pub fn timeout_request() -> Duration {
    parse_duration_ms("PHOTON_CLI_TIMEOUT_MS").unwrap_or(Duration::from_secs(10))
}

/// Timeout waiting for an auto-started daemon to come up.
pub fn timeout_connect() -> Duration {
    parse_duration_ms("PHOTON_CLI_CONNECT_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("photond is not running at {0}")]
    DaemonNotRunning(String),
    #[error("failed to start photond: {0}")]
    DaemonStartFailed(String),
    #[error("timed out waiting for photond to start")]
    DaemonStartTimeout,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("photond returned malformed JSON-RPC: {0}")]
    MalformedResponse(String),
    #[error("[{code}] {message}")]
    Rpc { code: i64, message: String },
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponseBody {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// A connection to a running `photond` instance's `/mcp` endpoint.
pub struct PhotonClient {
    base_url: String,
    http: reqwest::Client,
    next_id: std::sync::atomic::AtomicU64,
}

impl PhotonClient {
    /// Base URL, honoring `PHOTON_HOST`/`PHOTON_PORT` the same way `photond`
    /// resolves its own bind address (spec §6).
    pub fn base_url() -> String {
        if let Ok(url) = std::env::var("PHOTON_URL") {
            return url;
        }
        let host = std::env::var("PHOTON_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PHOTON_PORT").unwrap_or_else(|_| "4173".to_string());
        format!("http://{host}:{port}")
    }

    /// Connect to an already-running daemon; fails fast if unreachable.
    pub async fn connect() -> Result<Self, ClientError> {
        let base_url = Self::base_url();
        let client = Self { base_url: base_url.clone(), http: reqwest::Client::new(), next_id: std::sync::atomic::AtomicU64::new(1) };
        if client.probe().await {
            Ok(client)
        } else {
            Err(ClientError::DaemonNotRunning(base_url))
        }
    }

    /// Connect, auto-starting `photond` in the background if it is not
    /// reachable (mirrors the teacher's `connect_or_start`, simplified: no
    /// version-mismatch restart, since `photond` has no separate CLI
    /// version to drift against).
    pub async fn connect_or_start() -> Result<Self, ClientError> {
        let base_url = Self::base_url();
        let client = Self { base_url: base_url.clone(), http: reqwest::Client::new(), next_id: std::sync::atomic::AtomicU64::new(1) };
        if client.probe().await {
            return Ok(client);
        }
        crate::daemon_process::start_daemon_background()?;
        let deadline = tokio::time::Instant::now() + timeout_connect();
        loop {
            if client.probe().await {
                return Ok(client);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ClientError::DaemonStartTimeout);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn probe(&self) -> bool {
        self.http
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_millis(500))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    fn next_request_id(&self) -> Value {
        Value::from(self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
    }

    /// Issue a JSON-RPC request and wait for its response.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let body = serde_json::json!({
            "jsonrpc": JSONRPC_VERSION,
            "method": method,
            "params": params,
            "id": self.next_request_id(),
        });
        let resp = self
            .http
            .post(format!("{}/mcp", self.base_url))
            .json(&body)
            .timeout(timeout_request())
            .send()
            .await?;
        let parsed: RpcResponseBody = resp.json().await.map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
        match (parsed.result, parsed.error) {
            (Some(result), _) => Ok(result),
            (None, Some(err)) => {
                let kind = err.data.as_ref().and_then(|d| d.get("kind")).and_then(Value::as_str);
                let message = match kind {
                    Some(kind) => format!("{kind}: {}", err.message),
                    None => err.message,
                };
                Err(ClientError::Rpc { code: err.code, message })
            }
            (None, None) => Ok(Value::Null),
        }
    }

    /// `tools/list` (spec §6).
    pub async fn tools_list(&self) -> Result<Value, ClientError> {
        self.call("tools/list", Value::Null).await
    }

    /// `configuration/list` (spec §4.2 "POST dispatch").
    pub async fn configuration_list(&self) -> Result<Value, ClientError> {
        self.call("configuration/list", Value::Null).await
    }

    /// `tools/call` with a fully-qualified method name (spec §4.2).
    pub async fn tools_call(&self, name: &str, arguments: Value) -> Result<Value, ClientError> {
        self.call("tools/call", serde_json::json!({ "name": name, "arguments": arguments })).await
    }

    /// `GET /health`, used by `photon status`.
    pub async fn health(&self) -> Result<Value, ClientError> {
        let resp = self.http.get(format!("{}/health", self.base_url)).timeout(timeout_request()).send().await?;
        resp.json().await.map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
