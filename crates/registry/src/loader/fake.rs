//! Fake loader for deterministic registry tests, mirroring the teacher's
//! `FakeAgentAdapter`: programmable responses and a call log, no
//! subprocesses involved.

use super::{LoadedModule, LoaderError, PhotonLoader};
use async_trait::async_trait;
use parking_lot::Mutex;
use photon_core::descriptor::ConfigParam;
use photon_core::InvocationContext;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum LoaderCall {
    Precheck(PathBuf),
    Load(PathBuf),
    Invoke { path: PathBuf, method: String },
    Unload(PathBuf),
}

#[derive(Clone, Default)]
pub struct FakePhotonLoader {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    precheck_params: HashMap<PathBuf, Vec<ConfigParam>>,
    modules: HashMap<PathBuf, LoadedModule>,
    load_errors: HashMap<PathBuf, LoaderError>,
    invoke_results: HashMap<(PathBuf, String), Result<Value, LoaderError>>,
    calls: Vec<LoaderCall>,
}

impl FakePhotonLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_precheck_params(&self, path: impl Into<PathBuf>, params: Vec<ConfigParam>) {
        self.inner.lock().precheck_params.insert(path.into(), params);
    }

    pub fn set_module(&self, path: impl Into<PathBuf>, module: LoadedModule) {
        self.inner.lock().modules.insert(path.into(), module);
    }

    pub fn set_load_error(&self, path: impl Into<PathBuf>, error: LoaderError) {
        self.inner.lock().load_errors.insert(path.into(), error);
    }

    pub fn set_invoke_result(
        &self,
        path: impl Into<PathBuf>,
        method: impl Into<String>,
        result: Result<Value, LoaderError>,
    ) {
        self.inner
            .lock()
            .invoke_results
            .insert((path.into(), method.into()), result);
    }

    pub fn calls(&self) -> Vec<LoaderCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl PhotonLoader for FakePhotonLoader {
    async fn precheck(&self, path: &Path) -> Result<Vec<ConfigParam>, LoaderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(LoaderCall::Precheck(path.to_path_buf()));
        Ok(inner.precheck_params.get(path).cloned().unwrap_or_default())
    }

    async fn load(&self, path: &Path) -> Result<LoadedModule, LoaderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(LoaderCall::Load(path.to_path_buf()));
        if let Some(err) = inner.load_errors.get(path) {
            return Err(err.clone());
        }
        Ok(inner.modules.get(path).cloned().unwrap_or_default())
    }

    async fn invoke(
        &self,
        path: &Path,
        method: &str,
        _args: Value,
        _ctx: InvocationContext,
    ) -> Result<Value, LoaderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(LoaderCall::Invoke {
            path: path.to_path_buf(),
            method: method.to_string(),
        });
        inner
            .invoke_results
            .get(&(path.to_path_buf(), method.to_string()))
            .cloned()
            .unwrap_or(Ok(Value::Null))
    }

    async fn unload(&self, path: &Path) -> Result<(), LoaderError> {
        self.inner.lock().calls.push(LoaderCall::Unload(path.to_path_buf()));
        Ok(())
    }
}
