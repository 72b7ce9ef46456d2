//! The client abstraction federation speaks to an external tool server
//! through (spec §4.4 "Connect" / "Invoke"): one real implementation per
//! transport (`stdio`, streaming-HTTP-with-legacy-SSE-fallback), plus a fake
//! for deterministic catalog tests.

use crate::error::FederationError;
use async_trait::async_trait;
use photon_core::descriptor::MethodDescriptor;
use photon_core::InvocationContext;
use serde_json::Value;

/// A resource advertised by `resources/list`, trimmed to the fields the
/// catalog needs to decide `is_app` (spec §4.4: "a resource whose URI
/// begins with `ui://` ... promotes the server to `is-app`").
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    pub uri: String,
    pub mime_type: Option<String>,
}

/// One connected external tool server (spec §4.4).
///
/// `tools/list` results are mapped into [`MethodDescriptor`], the same
/// shape photons use; external methods carry no [`photon_core::Visibility`]
/// restriction (the wire encodes "both model and app" for them, matching
/// spec §3's "same shape as photon methods, minus visibility").
#[async_trait]
pub trait ExternalClient: Send + Sync + 'static {
    async fn list_tools(&self) -> Result<Vec<MethodDescriptor>, FederationError>;

    async fn list_resources(&self) -> Result<Vec<ResourceInfo>, FederationError>;

    /// Forward a call; the server's streamed progress events land on
    /// `ctx.events` with no buffering (spec §4.4 Invoke).
    async fn call_tool(&self, method: &str, args: Value, ctx: InvocationContext) -> Result<Value, FederationError>;

    /// Close gracefully; errors are swallowed by the caller with a 1s
    /// deadline (spec §4.4 Disconnect).
    async fn close(&self) -> Result<(), FederationError>;
}

pub mod fake;
pub mod http;
pub mod stdio;

pub use fake::FakeExternalClient;
pub use http::HttpExternalClient;
pub use stdio::StdioExternalClient;
