//! The federation catalog: external tool-server descriptors plus their live
//! clients, mirroring `photon_registry::registry::Registry`'s
//! `RwLock<State>` shape (spec §4.4 Federation layer).

use crate::client::{ExternalClient, HttpExternalClient, StdioExternalClient};
use crate::error::FederationError;
use parking_lot::RwLock;
use photon_core::external::{ExternalServerDescriptor, ExternalServerTransport};
use photon_core::{ControlPlaneError, ExternalServerId, InvocationContext};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Close deadline on disconnect (spec §5 "Federation graceful close: 1 s").
const CLOSE_DEADLINE: Duration = Duration::from_secs(1);

struct CatalogState {
    descriptors: HashMap<ExternalServerId, ExternalServerDescriptor>,
    clients: HashMap<ExternalServerId, Arc<dyn ExternalClient>>,
}

/// Factory for the real clients, swapped for a fake in tests (mirrors
/// `photon_registry::loader::PhotonLoader` being injected rather than
/// hard-coded to a subprocess implementation).
#[async_trait::async_trait]
pub trait ClientFactory: Send + Sync + 'static {
    async fn connect(&self, config: &ExternalServerTransport) -> Result<Arc<dyn ExternalClient>, FederationError>;
}

pub struct DefaultClientFactory;

#[async_trait::async_trait]
impl ClientFactory for DefaultClientFactory {
    async fn connect(&self, config: &ExternalServerTransport) -> Result<Arc<dyn ExternalClient>, FederationError> {
        match config {
            ExternalServerTransport::Stdio { command, args, env, cwd } => {
                let client = StdioExternalClient::connect(command, args, env, cwd.as_ref()).await?;
                Ok(Arc::new(client))
            }
            ExternalServerTransport::Url { url } => {
                let client = HttpExternalClient::connect(url).await?;
                Ok(Arc::new(client))
            }
        }
    }
}

/// Owns the set of external tool servers: their descriptors, live clients,
/// and the connect/reconnect/disconnect/invoke/list surface (spec §4.4).
pub struct FederationCatalog {
    factory: Arc<dyn ClientFactory>,
    state: RwLock<CatalogState>,
}

impl FederationCatalog {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            state: RwLock::new(CatalogState { descriptors: HashMap::new(), clients: HashMap::new() }),
        }
    }

    pub fn with_default_factory() -> Self {
        Self::new(Arc::new(DefaultClientFactory))
    }

    pub fn descriptors(&self) -> Vec<ExternalServerDescriptor> {
        self.state.read().descriptors.values().cloned().collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<ExternalServerDescriptor> {
        let id = ExternalServerId::from_name(name);
        self.state.read().descriptors.get(&id).cloned()
    }

    /// Connect, populate the method/resource catalog, and install the
    /// descriptor; on failure the descriptor is still installed with
    /// `connected = false` and a truncated error message, and the server
    /// stays in the catalog for later reconnect (spec §4.6).
    pub async fn connect(&self, name: &str, config: ExternalServerTransport) -> ExternalServerDescriptor {
        let mut descriptor = ExternalServerDescriptor::new(name, config.clone());

        match self.factory.connect(&config).await {
            Ok(client) => {
                self.populate(&mut descriptor, client.as_ref()).await;
                descriptor.connected = true;
                descriptor.error_message = None;
                self.state.write().clients.insert(descriptor.id.clone(), client);
            }
            Err(e) => {
                descriptor.connected = false;
                descriptor.error_message = Some(ControlPlaneError::truncate_message(&e.to_string()));
            }
        }

        self.install(descriptor.clone());
        descriptor
    }

    async fn populate(&self, descriptor: &mut ExternalServerDescriptor, client: &dyn ExternalClient) {
        if let Ok(methods) = client.list_tools().await {
            descriptor.methods = methods;
        }
        if let Ok(resources) = client.list_resources().await {
            for r in resources {
                descriptor.note_resource(&r.uri, r.mime_type.as_deref());
            }
        }
    }

    fn install(&self, descriptor: ExternalServerDescriptor) {
        self.state.write().descriptors.insert(descriptor.id.clone(), descriptor);
    }

    /// Tear down and reconnect with fresh state (spec §4.4 Reconnect);
    /// updates the descriptor atomically under the write lock.
    pub async fn reconnect(&self, name: &str) -> Result<ExternalServerDescriptor, ControlPlaneError> {
        let config = self
            .find_by_name(name)
            .map(|d| d.config)
            .ok_or_else(|| ControlPlaneError::NotFound(name.to_string()))?;

        self.disconnect(name).await;
        Ok(self.connect(name, config).await)
    }

    /// Close gracefully with a 1 s deadline; close errors are swallowed
    /// (spec §4.4 Disconnect, §5 timeout).
    pub async fn disconnect(&self, name: &str) {
        let id = ExternalServerId::from_name(name);
        let client = self.state.write().clients.remove(&id);
        if let Some(client) = client {
            let _ = tokio::time::timeout(CLOSE_DEADLINE, client.close()).await;
        }
        if let Some(descriptor) = self.state.write().descriptors.get_mut(&id) {
            descriptor.connected = false;
        }
    }

    /// Remove a server entirely (config-watcher-driven removal, spec §4.5).
    pub async fn remove(&self, name: &str) {
        self.disconnect(name).await;
        let id = ExternalServerId::from_name(name);
        self.state.write().descriptors.remove(&id);
    }

    /// Forward a call to the named server's method; no buffering of the
    /// server's streamed progress (spec §4.4 Invoke).
    pub async fn invoke(
        &self,
        name: &str,
        method: &str,
        args: Value,
        ctx: InvocationContext,
    ) -> Result<Value, ControlPlaneError> {
        let id = ExternalServerId::from_name(name);
        let client = self.state.read().clients.get(&id).cloned();
        let client = client.ok_or_else(|| ControlPlaneError::NotFound(name.to_string()))?;
        client.call_tool(method, args, ctx).await.map_err(Into::into)
    }
}
