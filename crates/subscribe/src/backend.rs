//! The backend abstraction hides whether channel events originate
//! in-process or cross-process (spec §4.3 "Backend abstraction").

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error, Clone)]
pub enum BackendError {
    #[error("backend subscribe failed: {0}")]
    SubscribeFailed(String),
    #[error("not subscribed: {photon}/{channel}")]
    NotSubscribed { photon: String, channel: String },
}

/// `(method, params)` pushed by a backend for a subscribed channel.
pub type BackendMessage = (String, Value);

#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Start receiving events for `photon`'s `channel`. Returns a receiver
    /// the subscription manager drains and republishes; dropping the
    /// backend's sender side (e.g. on `unsubscribe`) closes it.
    async fn subscribe(&self, photon: &str, channel: &str) -> Result<mpsc::Receiver<BackendMessage>, BackendError>;

    async fn unsubscribe(&self, photon: &str, channel: &str) -> Result<(), BackendError>;
}

/// Default backend: direct emitter wiring within the same process. Whatever
/// produces a photon's events calls [`InProcessBackend::emit`] and it is
/// delivered to whichever channel currently has a live subscription.
#[derive(Default)]
pub struct InProcessBackend {
    senders: Mutex<HashMap<(String, String), mpsc::Sender<BackendMessage>>>,
}

impl InProcessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to a subscribed channel. Returns `false` if nothing
    /// is currently subscribed (the caller should treat this as a no-op,
    /// not an error: publishers do not know or care whether anyone is
    /// watching).
    pub fn emit(&self, photon: &str, channel: &str, method: impl Into<String>, params: Value) -> bool {
        let sender = self.senders.lock().get(&(photon.to_string(), channel.to_string())).cloned();
        match sender {
            Some(tx) => tx.try_send((method.into(), params)).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl Backend for InProcessBackend {
    async fn subscribe(&self, photon: &str, channel: &str) -> Result<mpsc::Receiver<BackendMessage>, BackendError> {
        let (tx, rx) = mpsc::channel(64);
        self.senders.lock().insert((photon.to_string(), channel.to_string()), tx);
        Ok(rx)
    }

    async fn unsubscribe(&self, photon: &str, channel: &str) -> Result<(), BackendError> {
        self.senders.lock().remove(&(photon.to_string(), channel.to_string()));
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBackend;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_before_subscribe_is_a_silent_no_op() {
        let backend = InProcessBackend::new();
        assert!(!backend.emit("git-box", "board-1", "tick", serde_json::json!({})));
    }

    #[tokio::test]
    async fn subscribed_channel_receives_emitted_events() {
        let backend = InProcessBackend::new();
        let mut rx = backend.subscribe("git-box", "board-1").await.unwrap();
        assert!(backend.emit("git-box", "board-1", "tick", serde_json::json!({"n": 1})));
        let (method, params) = rx.recv().await.unwrap();
        assert_eq!(method, "tick");
        assert_eq!(params["n"], 1);
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_receiver() {
        let backend = InProcessBackend::new();
        let mut rx = backend.subscribe("git-box", "board-1").await.unwrap();
        backend.unsubscribe("git-box", "board-1").await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
