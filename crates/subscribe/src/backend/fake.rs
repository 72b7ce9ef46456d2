//! Test double for [`super::Backend`], grounded in the
//! `FakePhotonLoader`/`FakeEnv` pattern used across the other crates.

use super::{Backend, BackendError, BackendMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Subscribe(String, String),
    Unsubscribe(String, String),
}

#[derive(Default)]
struct FakeState {
    senders: std::collections::HashMap<(String, String), mpsc::Sender<BackendMessage>>,
    subscribe_errors: std::collections::HashMap<(String, String), BackendError>,
    calls: Vec<BackendCall>,
}

/// Records every `subscribe`/`unsubscribe` call and exposes [`FakeBackend::emit`]
/// so a test can push synthetic events through exactly as
/// [`super::InProcessBackend::emit`] would.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_subscribe_error(&self, photon: &str, channel: &str, error: BackendError) {
        self.state
            .lock()
            .subscribe_errors
            .insert((photon.to_string(), channel.to_string()), error);
    }

    pub fn emit(&self, photon: &str, channel: &str, method: impl Into<String>, params: serde_json::Value) -> bool {
        let sender = self.state.lock().senders.get(&(photon.to_string(), channel.to_string())).cloned();
        match sender {
            Some(tx) => tx.try_send((method.into(), params)).is_ok(),
            None => false,
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    pub fn is_subscribed(&self, photon: &str, channel: &str) -> bool {
        self.state.lock().senders.contains_key(&(photon.to_string(), channel.to_string()))
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn subscribe(&self, photon: &str, channel: &str) -> Result<mpsc::Receiver<BackendMessage>, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Subscribe(photon.to_string(), channel.to_string()));
        if let Some(err) = state.subscribe_errors.get(&(photon.to_string(), channel.to_string())) {
            return Err(err.clone());
        }
        let (tx, rx) = mpsc::channel(64);
        state.senders.insert((photon.to_string(), channel.to_string()), tx);
        Ok(rx)
    }

    async fn unsubscribe(&self, photon: &str, channel: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Unsubscribe(photon.to_string(), channel.to_string()));
        state.senders.remove(&(photon.to_string(), channel.to_string()));
        Ok(())
    }
}
