//! Fake external client for deterministic catalog tests, mirroring
//! `photon_registry::loader::fake::FakePhotonLoader`: programmable
//! responses and a call log, no subprocess or socket involved.

use super::{ExternalClient, ResourceInfo};
use crate::error::FederationError;
use async_trait::async_trait;
use parking_lot::Mutex;
use photon_core::descriptor::MethodDescriptor;
use photon_core::InvocationContext;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum ClientCall {
    ListTools,
    ListResources,
    CallTool { method: String, args: Value },
    Close,
}

#[derive(Clone, Default)]
pub struct FakeExternalClient {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    tools: Vec<MethodDescriptor>,
    resources: Vec<ResourceInfo>,
    list_tools_error: Option<FederationError>,
    invoke_results: HashMap<String, Result<Value, FederationError>>,
    calls: Vec<ClientCall>,
}

impl FakeExternalClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tools(&self, tools: Vec<MethodDescriptor>) {
        self.inner.lock().tools = tools;
    }

    pub fn set_resources(&self, resources: Vec<ResourceInfo>) {
        self.inner.lock().resources = resources;
    }

    pub fn set_list_tools_error(&self, error: FederationError) {
        self.inner.lock().list_tools_error = Some(error);
    }

    pub fn set_invoke_result(&self, method: impl Into<String>, result: Result<Value, FederationError>) {
        self.inner.lock().invoke_results.insert(method.into(), result);
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl ExternalClient for FakeExternalClient {
    async fn list_tools(&self) -> Result<Vec<MethodDescriptor>, FederationError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ClientCall::ListTools);
        if let Some(err) = &inner.list_tools_error {
            return Err(err.clone());
        }
        Ok(inner.tools.clone())
    }

    async fn list_resources(&self) -> Result<Vec<ResourceInfo>, FederationError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ClientCall::ListResources);
        Ok(inner.resources.clone())
    }

    async fn call_tool(&self, method: &str, args: Value, _ctx: InvocationContext) -> Result<Value, FederationError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ClientCall::CallTool { method: method.to_string(), args: args.clone() });
        inner.invoke_results.get(method).cloned().unwrap_or(Ok(Value::Null))
    }

    async fn close(&self) -> Result<(), FederationError> {
        self.inner.lock().calls.push(ClientCall::Close);
        Ok(())
    }
}
