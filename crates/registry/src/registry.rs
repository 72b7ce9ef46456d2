//! The photon registry: the single source of truth for photon descriptors
//! and handles (spec §4.1).

use crate::discover::{list_roots, PhotonCandidate};
use crate::env::EnvAccessor;
use crate::loader::{LoadedModule, PhotonLoader};
use parking_lot::RwLock;
use photon_core::descriptor::{ConfigParam, PhotonDescriptor, PhotonState};
use photon_core::{ControlPlaneError, InvocationContext, PhotonId};
use photon_storage::{ConfigStore, ConfigStoreError};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

struct RegistryState {
    descriptors: HashMap<PhotonId, PhotonDescriptor>,
    name_to_id: HashMap<String, PhotonId>,
    paths: HashMap<PhotonId, PathBuf>,
    config: photon_core::ConfigEnvelope,
}

/// Owns photon discovery, pre-check, load/reload, configuration, and
/// invocation. All state mutation happens through `&self` methods backed
/// by an internal lock; the lock is never held across an `.await`.
pub struct Registry {
    loader: Arc<dyn PhotonLoader>,
    env: Arc<dyn EnvAccessor>,
    config_store: Arc<ConfigStore>,
    working_dir: PathBuf,
    bundled_roots: Vec<PathBuf>,
    state: RwLock<RegistryState>,
}

impl Registry {
    pub fn new(
        loader: Arc<dyn PhotonLoader>,
        env: Arc<dyn EnvAccessor>,
        config_store: Arc<ConfigStore>,
        working_dir: PathBuf,
        bundled_roots: Vec<PathBuf>,
    ) -> Result<Self, ConfigStoreError> {
        let config = config_store.load_and_migrate()?;
        Ok(Self {
            loader,
            env,
            config_store,
            working_dir,
            bundled_roots,
            state: RwLock::new(RegistryState {
                descriptors: HashMap::new(),
                name_to_id: HashMap::new(),
                paths: HashMap::new(),
                config,
            }),
        })
    }

    pub fn descriptors(&self) -> Vec<PhotonDescriptor> {
        self.state.read().descriptors.values().cloned().collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<PhotonDescriptor> {
        let state = self.state.read();
        state.name_to_id.get(name).and_then(|id| state.descriptors.get(id)).cloned()
    }

    pub fn find_by_id(&self, id: &PhotonId) -> Option<PhotonDescriptor> {
        self.state.read().descriptors.get(id).cloned()
    }

    /// List roots, then pre-check (and if satisfied, load) every candidate
    /// not already known (spec §4.1 "List roots").
    pub async fn discover(&self) -> Vec<PhotonId> {
        let candidates = list_roots(&self.working_dir, &self.bundled_roots);
        let mut touched = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let id = PhotonId::from_path(&candidate.path);
            let known = self.state.read().descriptors.contains_key(&id);
            if !known {
                self.precheck_and_maybe_load(&candidate).await;
            }
            touched.push(id);
        }
        touched
    }

    async fn precheck_and_maybe_load(&self, candidate: &PhotonCandidate) {
        let id = PhotonId::from_path(&candidate.path);
        let params = match self.loader.precheck(&candidate.path).await {
            Ok(params) => params,
            Err(e) => {
                self.install_errored(&id, candidate, Vec::new(), &e.to_string());
                return;
            }
        };

        let unsatisfied: Vec<String> = params
            .iter()
            .filter(|p| p.is_unsatisfied(self.env.is_set(&p.env_key)))
            .map(|p| p.env_key.clone())
            .collect();

        if !unsatisfied.is_empty() {
            self.install_needs_config(&id, candidate, params, unsatisfied);
            return;
        }

        self.do_load(candidate, params).await;
    }

    async fn do_load(&self, candidate: &PhotonCandidate, params: Vec<ConfigParam>) {
        let id = PhotonId::from_path(&candidate.path);
        match self.loader.load(&candidate.path).await {
            Ok(module) => {
                self.backfill_defaults(&params);
                self.install_ready(candidate, &params, module);
            }
            Err(e) => {
                let message = ControlPlaneError::truncate_message(&e.to_string());
                self.install_errored(&id, candidate, params, &message);
            }
        }
    }

    /// A parameter satisfied by its declared default, but not yet present
    /// in the environment, is written so later code paths can rely on the
    /// env var being set (spec §4.1 Load: "backfill any environment
    /// variable that was satisfied by a default but not previously set").
    fn backfill_defaults(&self, params: &[ConfigParam]) {
        for p in params {
            if self.env.is_set(&p.env_key) {
                continue;
            }
            if let Some(Value::String(s)) = &p.default {
                self.env.set(&p.env_key, s);
            }
        }
    }

    fn install_ready(&self, candidate: &PhotonCandidate, params: &[ConfigParam], module: LoadedModule) -> PhotonDescriptor {
        let id = PhotonId::from_path(&candidate.path);
        let descriptor = PhotonDescriptor {
            id: id.clone(),
            name: candidate.name.clone(),
            path: candidate.path.clone(),
            state: PhotonState::Ready,
            config_params: params.to_vec(),
            methods: module.methods,
            app_entry: module.app_entry,
            metadata: module.metadata,
            resource_count: module.resource_count,
            prompt_count: module.prompt_count,
            dependencies: module.dependencies,
        };
        self.install(candidate, descriptor)
    }

    fn install_needs_config(
        &self,
        id: &PhotonId,
        candidate: &PhotonCandidate,
        params: Vec<ConfigParam>,
        missing: Vec<String>,
    ) {
        let descriptor = PhotonDescriptor {
            id: id.clone(),
            name: candidate.name.clone(),
            path: candidate.path.clone(),
            state: PhotonState::NeedsConfig { missing },
            config_params: params,
            methods: Vec::new(),
            app_entry: None,
            metadata: Default::default(),
            resource_count: 0,
            prompt_count: 0,
            dependencies: Vec::new(),
        };
        self.install(candidate, descriptor);
    }

    fn install_errored(&self, id: &PhotonId, candidate: &PhotonCandidate, params: Vec<ConfigParam>, message: &str) {
        let descriptor = PhotonDescriptor {
            id: id.clone(),
            name: candidate.name.clone(),
            path: candidate.path.clone(),
            state: PhotonState::Errored { message: message.to_string() },
            config_params: params,
            methods: Vec::new(),
            app_entry: None,
            metadata: Default::default(),
            resource_count: 0,
            prompt_count: 0,
            dependencies: Vec::new(),
        };
        self.install(candidate, descriptor);
    }

    fn install(&self, candidate: &PhotonCandidate, descriptor: PhotonDescriptor) -> PhotonDescriptor {
        let mut state = self.state.write();
        let id = descriptor.id.clone();
        state.name_to_id.insert(candidate.name.clone(), id.clone());
        state.paths.insert(id.clone(), candidate.path.clone());
        state.descriptors.insert(id, descriptor.clone());
        descriptor
    }

    /// Merge configuration into the process environment and the persisted
    /// envelope, then reload (if ready) or load (if it was `needs-config`)
    /// (spec §4.1 Configure).
    pub async fn configure(
        &self,
        name: &str,
        env_map: HashMap<String, String>,
    ) -> Result<PhotonDescriptor, ControlPlaneError> {
        let path = {
            let state = self.state.read();
            state.name_to_id.get(name).and_then(|id| state.paths.get(id)).cloned()
        }
        .ok_or_else(|| ControlPlaneError::NotFound(name.to_string()))?;

        for (k, v) in &env_map {
            self.env.set(k, v);
        }

        {
            let mut state = self.state.write();
            state.config.merge_photon_env(name, env_map);
        }
        self.persist_config()?;

        let was_ready = self.find_by_name(name).map(|d| d.state.is_ready()).unwrap_or(false);
        let candidate = PhotonCandidate { name: name.to_string(), path };

        if was_ready {
            self.reload(&candidate).await?;
        } else {
            self.precheck_and_maybe_load(&candidate).await;
        }

        self.find_by_name(name).ok_or_else(|| ControlPlaneError::NotFound(name.to_string()))
    }

    /// Atomically: shutdown hook on the old instance, clear the compiled
    /// cache, reload. On failure, retain the previous handle/descriptor and
    /// surface the error rather than leaving torn state (spec §4.1 Reload).
    pub async fn reload(&self, candidate: &PhotonCandidate) -> Result<PhotonDescriptor, ControlPlaneError> {
        let id = PhotonId::from_path(&candidate.path);
        let previous = self.find_by_id(&id);

        let _ = self.loader.unload(&candidate.path).await;

        let params = match self.loader.precheck(&candidate.path).await {
            Ok(params) => params,
            Err(e) => return self.reload_failed(&id, candidate, previous, &e.to_string()),
        };

        match self.loader.load(&candidate.path).await {
            Ok(module) => {
                self.backfill_defaults(&params);
                Ok(self.install_ready(candidate, &params, module))
            }
            Err(e) => self.reload_failed(&id, candidate, previous, &e.to_string()),
        }
    }

    fn reload_failed(
        &self,
        id: &PhotonId,
        candidate: &PhotonCandidate,
        previous: Option<PhotonDescriptor>,
        message: &str,
    ) -> Result<PhotonDescriptor, ControlPlaneError> {
        let truncated = ControlPlaneError::truncate_message(message);
        match previous {
            Some(mut prev) => {
                prev.state = PhotonState::Errored { message: truncated.clone() };
                self.install(candidate, prev);
            }
            None => self.install_errored(id, candidate, Vec::new(), &truncated),
        }
        Err(ControlPlaneError::LoadError(truncated))
    }

    /// Drop handle and descriptor, delete the envelope entry, persist
    /// (spec §4.1 Remove).
    pub fn remove(&self, name: &str) -> Result<(), ControlPlaneError> {
        let id = {
            let mut state = self.state.write();
            let id = state.name_to_id.remove(name).ok_or_else(|| ControlPlaneError::NotFound(name.to_string()))?;
            state.descriptors.remove(&id);
            state.paths.remove(&id);
            state.config.remove_photon(name);
            id
        };
        let _ = id;
        self.persist_config()
    }

    /// Resolve the live instance and method, then hand off to the loader,
    /// which executes with the bound yield sink and ask callback (spec
    /// §4.1 Invoke).
    pub async fn invoke(
        &self,
        id: &PhotonId,
        method: &str,
        args: Value,
        ctx: InvocationContext,
    ) -> Result<Value, ControlPlaneError> {
        let (path, descriptor) = {
            let state = self.state.read();
            (state.paths.get(id).cloned(), state.descriptors.get(id).cloned())
        };
        let path = path.ok_or_else(|| ControlPlaneError::NotFound(id.to_string()))?;
        let descriptor = descriptor.ok_or_else(|| ControlPlaneError::NotFound(id.to_string()))?;

        match &descriptor.state {
            PhotonState::Ready => {}
            PhotonState::NeedsConfig { missing } => {
                return Err(ControlPlaneError::Unconfigured { missing: missing.clone() })
            }
            PhotonState::Errored { message } => {
                return Err(ControlPlaneError::LoadError(message.clone()))
            }
        }

        descriptor
            .find_method(method)
            .ok_or_else(|| ControlPlaneError::NotFound(method.to_string()))?;

        if ctx.cancellation.is_cancelled() {
            return Err(ControlPlaneError::Cancelled);
        }

        self.loader.invoke(&path, method, args, ctx).await.map_err(Into::into)
    }

    fn persist_config(&self) -> Result<(), ControlPlaneError> {
        let envelope = self.state.read().config.clone();
        self.config_store
            .save(&envelope)
            .map_err(|e| ControlPlaneError::LoadError(e.to_string()))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
