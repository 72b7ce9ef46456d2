//! Constructs the registry, federation catalog, subscription manager,
//! watchers, and transport router from a [`Config`], and keeps the
//! watcher-driven reconciliation tasks running for the life of the
//! process (spec §4 end to end).

use crate::config::Config;
use axum::Router;
use photon_core::ConfigEnvelope;
use photon_federation::FederationCatalog;
use photon_registry::{default_worker_command, ProcessEnv, Registry, SubprocessPhotonLoader};
use photon_storage::ConfigStore;
use photon_subscribe::{InProcessBackend, SubscriptionManager};
use photon_transport::{AppState, SessionStore, TransportSessionSink};
use photon_watch::{ConfigWatcher, PhotonFsWatcher};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("failed to load configuration envelope: {0}")]
    Config(#[from] photon_storage::ConfigStoreError),
    #[error("failed to start filesystem watcher: {0}")]
    FsWatch(#[from] photon_watch::WatchError),
}

/// Everything spawned by [`build`]. Dropping this tears down the watchers
/// and the idle reaper along with it, so it must be kept alive for the
/// life of the server.
pub struct Daemon {
    pub router: Router,
    pub state: AppState<InProcessBackend>,
    _config_watcher: ConfigWatcher,
    _fs_watcher: PhotonFsWatcher,
    _reaper: JoinHandle<()>,
}

pub async fn build(config: &Config) -> Result<Daemon, WiringError> {
    let config_store = Arc::new(ConfigStore::new(config.config_path.clone()));
    let initial_envelope = config_store.load_and_migrate()?;

    let env = Arc::new(ProcessEnv);
    let loader = Arc::new(SubprocessPhotonLoader::new(default_worker_command));
    let registry = Arc::new(Registry::new(
        loader,
        env,
        Arc::clone(&config_store),
        config.working_dir.clone(),
        config.bundled_roots.clone(),
    )?);
    registry.discover().await;

    let federation = Arc::new(FederationCatalog::with_default_factory());
    connect_configured_servers(&federation, &initial_envelope).await;

    let sessions = Arc::new(SessionStore::with_default_idle_timeout());
    let sink = Arc::new(TransportSessionSink { sessions: Arc::clone(&sessions) });
    let backend = Arc::new(InProcessBackend::new());
    let subscriptions = SubscriptionManager::new(backend, sink);

    let state = AppState::new(
        Arc::clone(&registry),
        Arc::clone(&federation),
        Arc::clone(&subscriptions),
        Arc::clone(&sessions),
    );

    let config_watcher = spawn_config_reconciler(config, Arc::clone(&federation), Arc::clone(&sessions), initial_envelope)?;
    let fs_watcher = spawn_fs_reconciler(config, Arc::clone(&registry), Arc::clone(&sessions))?;

    let router = photon_transport::build_router(state.clone());
    let reaper = photon_transport::spawn_idle_reaper(state.clone());

    Ok(Daemon { router, state, _config_watcher: config_watcher, _fs_watcher: fs_watcher, _reaper: reaper })
}

async fn connect_configured_servers(federation: &Arc<FederationCatalog>, envelope: &ConfigEnvelope) {
    let mut handles = Vec::new();
    for (name, config) in envelope.mcp_servers.clone() {
        let federation = Arc::clone(federation);
        handles.push(tokio::spawn(async move {
            let descriptor = federation.connect(&name, config).await;
            if !descriptor.connected {
                warn!(server = %name, error = ?descriptor.error_message, "external server failed to connect at startup");
            }
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
}

/// Drives `mcpServers` edits from the debounced config watcher into the
/// federation catalog, broadcasting `tools/list_changed` after each
/// reconciled batch (spec §4.5, §4.2).
fn spawn_config_reconciler(
    config: &Config,
    federation: Arc<FederationCatalog>,
    sessions: Arc<SessionStore>,
    initial: ConfigEnvelope,
) -> Result<ConfigWatcher, photon_watch::WatchError> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    let watcher = ConfigWatcher::start(config.config_path.clone(), initial, tx)?;

    tokio::spawn(async move {
        use photon_watch::ServerChange;

        while let Some(changes) = rx.recv().await {
            for change in changes {
                match change {
                    ServerChange::Added(name, transport) => {
                        federation.connect(&name, transport).await;
                    }
                    ServerChange::Modified(name, transport) => {
                        federation.disconnect(&name).await;
                        federation.connect(&name, transport).await;
                    }
                    ServerChange::Removed(name) => {
                        federation.remove(&name).await;
                    }
                }
            }
            sessions.broadcast_all(serde_json::json!({ "method": "notifications/tools/list_changed" }));
        }
    });

    Ok(watcher)
}

/// Drives changed-photon names from the debounced filesystem watcher into
/// `Registry::reload` (or `discover` for a photon not yet known), then
/// broadcasts `tools/list_changed` (spec §4.5, §4.2).
fn spawn_fs_reconciler(
    config: &Config,
    registry: Arc<Registry>,
    sessions: Arc<SessionStore>,
) -> Result<PhotonFsWatcher, photon_watch::WatchError> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(256);
    let is_known = {
        let registry = Arc::clone(&registry);
        move |name: &str| registry.find_by_name(name).is_some()
    };
    let watcher =
        PhotonFsWatcher::start(config.working_dir.clone(), config.bundled_roots.clone(), is_known, tx)?;

    tokio::spawn(async move {
        while let Some(name) = rx.recv().await {
            match registry.find_by_name(&name) {
                Some(descriptor) => {
                    let candidate = photon_registry::PhotonCandidate { name: name.clone(), path: descriptor.path };
                    if let Err(e) = registry.reload(&candidate).await {
                        warn!(photon = %name, error = %e, "reload failed");
                    }
                }
                None => {
                    info!(photon = %name, "new photon detected, running discovery");
                    registry.discover().await;
                }
            }
            sessions.broadcast_all(serde_json::json!({ "method": "notifications/tools/list_changed" }));
        }
    });

    Ok(watcher)
}
