//! Shared application state for the streamable endpoint, mirroring
//! `examples/other_examples/..._server-transport.rs.rs`'s `HttpState`
//! struct, generalized to photons + federation instead of a single tool
//! list (spec §4.2).

use crate::cancel_registry::CancelRegistry;
use crate::session::SessionStore;
use async_trait::async_trait;
use photon_core::{ElicitationRequest, SessionId};
use photon_federation::FederationCatalog;
use photon_registry::Registry;
use photon_subscribe::{Backend, SessionSink, SubscriptionManager};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// A pending server-initiated elicitation, awaiting the client's next POST
/// correlated by request id (spec §4.2 "elicitation/create ... correlated
/// by request id to the client's subsequent POST response").
#[derive(Default)]
pub struct ElicitationTable {
    pending: parking_lot::Mutex<HashMap<(SessionId, String), oneshot::Sender<Value>>>,
}

impl ElicitationTable {
    pub fn register(&self, session: SessionId, request_id: String, reply: oneshot::Sender<Value>) {
        self.pending.lock().insert((session, request_id), reply);
    }

    /// Resolve a pending elicitation with the client's answer; returns
    /// `false` if no such request is pending (stale or unknown id).
    pub fn resolve(&self, session: &SessionId, request_id: &str, answer: Value) -> bool {
        let reply = self.pending.lock().remove(&(session.clone(), request_id.to_string()));
        match reply {
            Some(reply) => reply.send(answer).is_ok(),
            None => false,
        }
    }
}

pub struct AppState<B: Backend> {
    pub registry: Arc<Registry>,
    pub federation: Arc<FederationCatalog>,
    pub subscriptions: Arc<SubscriptionManager<B>>,
    pub sessions: Arc<SessionStore>,
    pub cancellations: Arc<CancelRegistry>,
    pub elicitations: Arc<ElicitationTable>,
}

impl<B: Backend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            federation: Arc::clone(&self.federation),
            subscriptions: Arc::clone(&self.subscriptions),
            sessions: Arc::clone(&self.sessions),
            cancellations: Arc::clone(&self.cancellations),
            elicitations: Arc::clone(&self.elicitations),
        }
    }
}

impl<B: Backend> AppState<B> {
    pub fn new(
        registry: Arc<Registry>,
        federation: Arc<FederationCatalog>,
        subscriptions: Arc<SubscriptionManager<B>>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            registry,
            federation,
            subscriptions,
            sessions,
            cancellations: Arc::new(CancelRegistry::new()),
            elicitations: Arc::new(ElicitationTable::default()),
        }
    }
}

/// Wires [`SubscriptionManager`] notifications onto a session's SSE stream
/// (spec §4.3 Publish "broadcast ... via the transport's send-to-session").
pub struct TransportSessionSink {
    pub sessions: Arc<SessionStore>,
}

#[async_trait]
impl SessionSink for TransportSessionSink {
    async fn send_to_session(&self, session: &SessionId, method: &str, params: Value) {
        self.sessions.push(session, serde_json::json!({ "method": method, "params": params }));
    }
}

/// One elicitation request surfaced to a session; the dispatch layer hands
/// this off to `push` on the session's stream and stores the reply sender
/// in the [`ElicitationTable`].
pub struct PendingElicitation {
    pub request: ElicitationRequest,
}
