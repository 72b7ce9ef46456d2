//! Subscription manager (spec §4.3 "Observe / Release / Publish").

use crate::backend::{Backend, BackendMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use photon_core::channel::{ChannelRing, ReplayOutcome};
use photon_core::id::SessionId;
use photon_core::session::ViewState;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Where the manager delivers notifications once it has decided who should
/// see an event: the transport layer's per-session SSE sender.
#[async_trait]
pub trait SessionSink: Send + Sync + 'static {
    async fn send_to_session(&self, session: &SessionId, method: &str, params: Value);
}

struct ManagedChannel {
    ring: ChannelRing,
    viewers: HashSet<SessionId>,
}

impl ManagedChannel {
    fn new() -> Self {
        Self { ring: ChannelRing::new(), viewers: HashSet::new() }
    }
}

/// Tracks, per `<photon-id>:<item-id>` channel, the bounded replay ring and
/// the set of sessions currently viewing it; drives the backend's
/// subscribe/unsubscribe lifecycle off the 0↔1 ref-count edge.
pub struct SubscriptionManager<B: Backend> {
    backend: Arc<B>,
    sink: Arc<dyn SessionSink>,
    channels: Mutex<HashMap<String, ManagedChannel>>,
    session_views: Mutex<HashMap<SessionId, ViewState>>,
}

impl<B: Backend> SubscriptionManager<B> {
    pub fn new(backend: Arc<B>, sink: Arc<dyn SessionSink>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            sink,
            channels: Mutex::new(HashMap::new()),
            session_views: Mutex::new(HashMap::new()),
        })
    }

    /// spec §4.3 Observe.
    pub async fn observe(self: &Arc<Self>, session: SessionId, view: ViewState, last_event_id: Option<u64>) {
        let previous_view = self.session_views.lock().insert(session.clone(), view.clone());
        if let Some(prev) = previous_view {
            if prev.channel_key() != view.channel_key() {
                self.release_channel(&session, &prev).await;
            } else {
                // Re-observing the same view: nothing to release, still
                // honor last_event_id below.
            }
        }

        let key = view.channel_key();
        let just_subscribed = {
            let mut channels = self.channels.lock();
            let chan = channels.entry(key.clone()).or_insert_with(ManagedChannel::new);
            let newly_joined = chan.viewers.insert(session.clone());
            if newly_joined {
                chan.ring.incref() == 1
            } else {
                false
            }
        };

        if just_subscribed {
            match self.backend.subscribe(&view.photon_id, &key).await {
                Ok(rx) => self.spawn_forwarder(key.clone(), rx),
                Err(error) => warn!(channel = %key, %error, "backend subscribe failed"),
            }
        }

        let outcome = {
            let channels = self.channels.lock();
            channels.get(&key).map(|chan| chan.ring.replay_from(last_event_id))
        };

        match outcome {
            Some(ReplayOutcome::RefreshNeeded) => {
                self.sink
                    .send_to_session(&session, "notifications/refresh-needed", serde_json::json!({ "channel": key }))
                    .await;
            }
            Some(ReplayOutcome::Replay(events)) => {
                for event in events {
                    self.sink
                        .send_to_session(
                            &session,
                            &event.method,
                            serde_json::json!({ "channel": key, "id": event.id, "params": event.params }),
                        )
                        .await;
                }
            }
            None => {}
        }
    }

    /// spec §4.3 Release, driven by an explicit session teardown (e.g. the
    /// transport closing a connection) rather than a view change.
    pub async fn release_session(self: &Arc<Self>, session: &SessionId) {
        let view = self.session_views.lock().remove(session);
        if let Some(view) = view {
            self.release_channel(session, &view).await;
        }
    }

    async fn release_channel(self: &Arc<Self>, session: &SessionId, view: &ViewState) {
        let key = view.channel_key();
        let should_unsubscribe = {
            let mut channels = self.channels.lock();
            let Some(chan) = channels.get_mut(&key) else {
                return;
            };
            if !chan.viewers.remove(session) {
                return;
            }
            let remaining = chan.ring.decref();
            if remaining == 0 {
                // Discard the buffer outright (spec §4.3 leaves this choice
                // to the implementer); a late reconnect simply sees
                // refresh-needed via a freshly empty ring.
                channels.remove(&key);
                true
            } else {
                false
            }
        };

        if should_unsubscribe {
            if let Err(error) = self.backend.unsubscribe(&view.photon_id, &key).await {
                warn!(channel = %key, %error, "backend unsubscribe failed");
            }
        }
    }

    /// spec §4.3 Publish.
    pub async fn publish(self: &Arc<Self>, channel: &str, method: impl Into<String>, params: Value) {
        let method = method.into();
        let published = {
            let mut channels = self.channels.lock();
            channels.get_mut(channel).map(|chan| {
                let event = chan.ring.publish(method, params);
                (event, chan.viewers.iter().cloned().collect::<Vec<_>>())
            })
        };
        let Some((event, viewers)) = published else {
            return;
        };
        for session in viewers {
            self.sink
                .send_to_session(
                    &session,
                    &event.method,
                    serde_json::json!({ "channel": channel, "id": event.id, "params": event.params }),
                )
                .await;
        }
    }

    fn spawn_forwarder(self: &Arc<Self>, key: String, mut rx: mpsc::Receiver<BackendMessage>)
    where
        B: 'static,
    {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            while let Some((method, params)) = rx.recv().await {
                manager.publish(&key, method, params).await;
            }
        });
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
