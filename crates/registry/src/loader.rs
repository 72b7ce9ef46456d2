//! The `PhotonLoader` trait abstracts "execute this module and instantiate
//! its default-exported class" (spec §4.1 Load). Rust cannot dynamically
//! load a module written in the photon's own source language in-process,
//! so the production implementation models loading as a conversation with
//! a long-lived subprocess worker over a line-delimited JSON protocol on
//! stdio — the same shape as the teacher's `AgentAdapter` (spawn / send /
//! kill) but scoped to one worker process per loaded photon.

use async_trait::async_trait;
use photon_core::descriptor::{ClassMetadata, ConfigParam, MethodDescriptor};
use photon_core::{ControlPlaneError, InvocationContext};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default timeout for `load`/`reload` (spec §5 Timeouts).
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, Clone)]
pub enum LoaderError {
    #[error("load timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Failed(String),
    #[error("naming collision: method '{method}' is a non-function property; available methods: {available:?}")]
    NamingCollision { method: String, available: Vec<String> },
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("cancelled")]
    Cancelled,
}

impl From<LoaderError> for ControlPlaneError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::Timeout(_) | LoaderError::Failed(_) => {
                ControlPlaneError::LoadError(ControlPlaneError::truncate_message(&err.to_string()))
            }
            LoaderError::NamingCollision { .. } | LoaderError::MethodNotFound(_) => {
                ControlPlaneError::InvocationError(err.to_string())
            }
            LoaderError::Cancelled => ControlPlaneError::Cancelled,
        }
    }
}

/// Everything extracted from a successful load, in terms the registry can
/// turn directly into a [`photon_core::PhotonDescriptor`].
#[derive(Debug, Clone, Default)]
pub struct LoadedModule {
    pub config_params: Vec<ConfigParam>,
    pub methods: Vec<MethodDescriptor>,
    pub metadata: ClassMetadata,
    pub app_entry: Option<String>,
    pub resource_count: usize,
    pub prompt_count: usize,
    pub dependencies: Vec<String>,
}

/// Abstraction over "run the photon's code". One worker is kept alive per
/// loaded photon path so `invoke` can reuse warm state between calls; `load`
/// both starts the worker and extracts its schema.
#[async_trait]
pub trait PhotonLoader: Send + Sync + 'static {
    /// Static extraction only: declared constructor parameters, without
    /// instantiating the class (spec §4.1 Pre-check). Cheap enough to run
    /// before deciding whether a full `load` is worthwhile.
    async fn precheck(&self, path: &Path) -> Result<Vec<ConfigParam>, LoaderError>;

    async fn load(&self, path: &Path) -> Result<LoadedModule, LoaderError>;

    async fn invoke(
        &self,
        path: &Path,
        method: &str,
        args: Value,
        ctx: InvocationContext,
    ) -> Result<Value, LoaderError>;

    /// Invoke any shutdown hook and tear down the worker (spec §4.1 Reload:
    /// "invoke any shutdown hook on the old instance").
    async fn unload(&self, path: &Path) -> Result<(), LoaderError>;
}

/// Spawns one subprocess worker per photon path and speaks a minimal
/// newline-delimited JSON protocol with it: `{"op":"load"}`,
/// `{"op":"invoke","method":...,"args":...}`, `{"op":"unload"}`, each
/// answered by a single `{"ok":true,...}` or `{"ok":false,"error":...}`
/// line. The worker command is resolved from the photon's shebang/runtime
/// convention; wiring that resolution up is left to the caller via
/// `worker_command`.
pub struct SubprocessPhotonLoader {
    worker_command: Box<dyn Fn(&Path) -> (String, Vec<String>) + Send + Sync>,
}

impl SubprocessPhotonLoader {
    pub fn new(worker_command: impl Fn(&Path) -> (String, Vec<String>) + Send + Sync + 'static) -> Self {
        Self { worker_command: Box::new(worker_command) }
    }
}

#[async_trait]
impl PhotonLoader for SubprocessPhotonLoader {
    async fn precheck(&self, path: &Path) -> Result<Vec<ConfigParam>, LoaderError> {
        let (command, args) = (self.worker_command)(path);
        let result = tokio::time::timeout(LOAD_TIMEOUT, run_worker(&command, &args, path, "precheck", Value::Null))
            .await
            .map_err(|_| LoaderError::Timeout(LOAD_TIMEOUT))??;
        serde_json::from_value(result).map_err(|e| LoaderError::Failed(format!("malformed precheck result: {e}")))
    }

    async fn load(&self, path: &Path) -> Result<LoadedModule, LoaderError> {
        let (command, args) = (self.worker_command)(path);
        let outcome = tokio::time::timeout(LOAD_TIMEOUT, run_worker(&command, &args, path, "load", Value::Null))
            .await
            .map_err(|_| LoaderError::Timeout(LOAD_TIMEOUT))??;
        parse_loaded_module(outcome)
    }

    async fn invoke(
        &self,
        path: &Path,
        method: &str,
        args: Value,
        ctx: InvocationContext,
    ) -> Result<Value, LoaderError> {
        let (command, worker_args) = (self.worker_command)(path);
        let payload = serde_json::json!({ "method": method, "args": args });
        run_worker_invoke(&command, &worker_args, path, payload, &ctx).await
    }

    async fn unload(&self, path: &Path) -> Result<(), LoaderError> {
        let (command, args) = (self.worker_command)(path);
        run_worker(&command, &args, path, "unload", Value::Null).await?;
        Ok(())
    }
}

async fn run_worker(
    command: &str,
    args: &[String],
    path: &Path,
    op: &str,
    payload: Value,
) -> Result<Value, LoaderError> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::process::Command;

    let mut child = Command::new(command)
        .args(args)
        .arg(path)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| LoaderError::Failed(format!("spawn failed: {e}")))?;

    let request = serde_json::json!({ "op": op, "payload": payload });
    let mut line = serde_json::to_vec(&request).map_err(|e| LoaderError::Failed(e.to_string()))?;
    line.push(b'\n');

    let mut stdin = child.stdin.take().ok_or_else(|| LoaderError::Failed("no stdin".into()))?;
    stdin
        .write_all(&line)
        .await
        .map_err(|e| LoaderError::Failed(format!("write failed: {e}")))?;
    drop(stdin);

    let stdout = child.stdout.take().ok_or_else(|| LoaderError::Failed("no stdout".into()))?;
    let mut reader = BufReader::new(stdout).lines();
    let response_line = reader
        .next_line()
        .await
        .map_err(|e| LoaderError::Failed(format!("read failed: {e}")))?
        .ok_or_else(|| LoaderError::Failed("worker closed stdout with no response".into()))?;

    let _ = child.kill().await;

    let response: Value = serde_json::from_str(&response_line)
        .map_err(|e| LoaderError::Failed(format!("malformed worker response: {e}")))?;

    if response.get("ok").and_then(Value::as_bool) == Some(true) {
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    } else {
        let message = response
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown worker error")
            .to_string();
        Err(LoaderError::Failed(message))
    }
}

/// Speaks the multi-line `invoke` protocol: one request line, then any
/// number of streamed `yield`/`ask` frames, terminated by exactly one
/// `result`/`error` frame (SPEC_FULL C.1). Unlike [`run_worker`] the
/// worker's stdin is kept open for the life of the call so an `ask`
/// frame's answer can be relayed back, and the read loop races the
/// cancellation token at every line so `$/cancelRequest` can interrupt a
/// call that never yields again (spec §5 "Invocations check a
/// cancellation token at each await point").
async fn run_worker_invoke(
    command: &str,
    args: &[String],
    path: &Path,
    payload: Value,
    ctx: &InvocationContext,
) -> Result<Value, LoaderError> {
    use photon_core::InvocationEvent;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::process::Command;

    let mut child = Command::new(command)
        .args(args)
        .arg(path)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| LoaderError::Failed(format!("spawn failed: {e}")))?;

    let request = serde_json::json!({ "op": "invoke", "payload": payload });
    let mut line = serde_json::to_vec(&request).map_err(|e| LoaderError::Failed(e.to_string()))?;
    line.push(b'\n');

    let mut stdin = child.stdin.take().ok_or_else(|| LoaderError::Failed("no stdin".into()))?;
    stdin
        .write_all(&line)
        .await
        .map_err(|e| LoaderError::Failed(format!("write failed: {e}")))?;

    let stdout = child.stdout.take().ok_or_else(|| LoaderError::Failed("no stdout".into()))?;
    let mut reader = BufReader::new(stdout).lines();

    let outcome = loop {
        tokio::select! {
            biased;
            _ = ctx.cancellation.cancelled() => {
                break Err(LoaderError::Cancelled);
            }
            next = reader.next_line() => {
                let next = match next {
                    Ok(next) => next,
                    Err(e) => break Err(LoaderError::Failed(format!("read failed: {e}"))),
                };
                let Some(raw) = next else {
                    break Err(LoaderError::Failed("worker closed stdout with no response".into()));
                };
                let frame: Value = match serde_json::from_str(&raw) {
                    Ok(frame) => frame,
                    Err(e) => break Err(LoaderError::Failed(format!("malformed worker frame: {e}"))),
                };

                match frame.get("type").and_then(Value::as_str) {
                    Some("result") => break Ok(frame.get("value").cloned().unwrap_or(Value::Null)),
                    Some("error") => {
                        let message = frame
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown worker error")
                            .to_string();
                        break Err(LoaderError::Failed(message));
                    }
                    Some("yield") => {
                        let value = frame.get("value").cloned().unwrap_or(Value::Null);
                        let event = match frame.get("channel").and_then(Value::as_str) {
                            Some("status") => InvocationEvent::Status(value),
                            Some("log") => InvocationEvent::Log(value),
                            _ => InvocationEvent::Progress(value),
                        };
                        let _ = ctx.events.send(event).await;
                    }
                    Some("ask") => {
                        let request_id =
                            frame.get("requestId").and_then(Value::as_str).unwrap_or_default().to_string();
                        let prompt = frame.get("prompt").cloned().unwrap_or(Value::Null);
                        let answer = ctx.ask(prompt).await.unwrap_or(Value::Null);
                        let response =
                            serde_json::json!({ "op": "ask-response", "requestId": request_id, "answer": answer });
                        match serde_json::to_vec(&response) {
                            Ok(mut response_line) => {
                                response_line.push(b'\n');
                                if stdin.write_all(&response_line).await.is_err() {
                                    break Err(LoaderError::Failed(
                                        "failed to relay elicitation answer to worker".into(),
                                    ));
                                }
                            }
                            Err(e) => break Err(LoaderError::Failed(e.to_string())),
                        }
                    }
                    other => break Err(LoaderError::Failed(format!("unexpected worker frame type: {other:?}"))),
                }
            }
        }
    };

    drop(stdin);
    let _ = child.kill().await;
    outcome
}

fn parse_loaded_module(value: Value) -> Result<LoadedModule, LoaderError> {
    serde_json::from_value(value).map_err(|e| LoaderError::Failed(format!("malformed schema: {e}")))
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePhotonLoader, LoaderCall};

/// Resolve the worker command for a photon path from its file extension,
/// mirroring the runtime-convention shebang resolution the original loader
/// dispatches on.
pub fn default_worker_command(path: &Path) -> (String, Vec<String>) {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ts") => ("node".to_string(), vec!["--loader".into(), "ts-node/esm".into()]),
        Some("py") => ("python3".to_string(), vec![]),
        _ => ("node".to_string(), vec![]),
    }
}

pub fn path_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
