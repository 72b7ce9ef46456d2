//! Session lifecycle and the per-session outbound stream (spec §4.2 "State
//! machine per session", §3 "Session").

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use photon_core::{Session, SessionId, SessionPhase, ViewState};
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Idle window after which a session with no open SSE stream is torn down
/// (spec §3 "live until explicit termination or a configurable idle
/// timeout").
pub const DEFAULT_IDLE_TIMEOUT_SECS: i64 = 300;

/// One outbound SSE frame: an assigned event id plus the JSON-RPC
/// notification body to serialize as `data:` (spec §4.2 step 4).
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub id: u64,
    pub body: serde_json::Value,
}

struct Entry {
    session: Session,
    outbound: broadcast::Sender<OutboundEvent>,
}

/// Owns every live [`Session`] plus its outbound broadcast channel. A
/// session may have at most one open GET stream (spec §3); re-subscribing
/// simply creates a fresh broadcast receiver off the same sender, so only
/// one live receiver is expected to be drained at a time in practice.
pub struct SessionStore {
    idle_timeout: ChronoDuration,
    entries: Mutex<HashMap<SessionId, Entry>>,
}

impl SessionStore {
    pub fn new(idle_timeout: ChronoDuration) -> Self {
        Self { idle_timeout, entries: Mutex::new(HashMap::new()) }
    }

    pub fn with_default_idle_timeout() -> Self {
        Self::new(ChronoDuration::seconds(DEFAULT_IDLE_TIMEOUT_SECS))
    }

    /// Create a new session in the `uninitialized` phase (spec §4.2).
    pub fn create(&self, id: SessionId) -> SessionId {
        let now = Utc::now();
        let (tx, _rx) = broadcast::channel(256);
        self.entries.lock().insert(id.clone(), Entry { session: Session::new(id.clone(), now), outbound: tx });
        id
    }

    pub fn exists(&self, id: &SessionId) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn touch(&self, id: &SessionId) {
        if let Some(entry) = self.entries.lock().get_mut(id) {
            entry.session.touch(Utc::now());
        }
    }

    pub fn initialize(&self, id: &SessionId) {
        if let Some(entry) = self.entries.lock().get_mut(id) {
            entry.session.phase = SessionPhase::Initialized;
        }
    }

    pub fn terminate(&self, id: &SessionId) {
        if let Some(entry) = self.entries.lock().get_mut(id) {
            entry.session.phase = SessionPhase::Terminated;
        }
    }

    pub fn phase(&self, id: &SessionId) -> Option<SessionPhase> {
        self.entries.lock().get(id).map(|e| e.session.phase)
    }

    pub fn view(&self, id: &SessionId) -> Option<ViewState> {
        self.entries.lock().get(id).and_then(|e| e.session.view.clone())
    }

    pub fn set_view(&self, id: &SessionId, view: ViewState) {
        if let Some(entry) = self.entries.lock().get_mut(id) {
            entry.session.view = Some(view);
        }
    }

    /// Subscribe a fresh receiver to this session's outbound stream, for a
    /// newly opened GET (spec §4.2 step 2 "attach the stream to the
    /// session's sink").
    pub fn subscribe(&self, id: &SessionId) -> Option<broadcast::Receiver<OutboundEvent>> {
        self.entries.lock().get(id).map(|e| e.outbound.subscribe())
    }

    /// Assign the next event id and push to every subscriber; silently
    /// drops if nobody is listening, matching the backend's emit-is-best-
    /// effort stance.
    pub fn push(&self, id: &SessionId, body: serde_json::Value) {
        let entries = self.entries.lock();
        let Some(entry) = entries.get(id) else { return };
        let event_id = entry.session.next_event_id();
        let _ = entry.outbound.send(OutboundEvent { id: event_id, body });
    }

    /// Remove every session whose last-seen exceeds the idle timeout,
    /// returning their ids so the caller can release their channel views
    /// (spec §4.6 "Session disconnect mid-invocation").
    pub fn reap_idle(&self) -> Vec<SessionId> {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        let expired: Vec<SessionId> = entries
            .iter()
            .filter(|(_, e)| e.session.is_idle(now, self.idle_timeout))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            entries.remove(id);
        }
        expired
    }

    pub fn remove(&self, id: &SessionId) {
        self.entries.lock().remove(id);
    }

    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Push the same notification body onto every live session's stream,
    /// each with its own freshly assigned event id (spec §4.2 "all state
    /// changes produce a `tools/list_changed` notification on every open
    /// SSE stream").
    pub fn broadcast_all(&self, body: serde_json::Value) {
        let entries = self.entries.lock();
        for entry in entries.values() {
            let event_id = entry.session.next_event_id();
            let _ = entry.outbound.send(OutboundEvent { id: event_id, body: body.clone() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_initialize_transitions_phase() {
        let store = SessionStore::with_default_idle_timeout();
        let id = store.create(SessionId::new("s1"));
        assert_eq!(store.phase(&id), Some(SessionPhase::Uninitialized));
        store.initialize(&id);
        assert_eq!(store.phase(&id), Some(SessionPhase::Initialized));
    }

    #[test]
    fn push_without_subscriber_does_not_panic() {
        let store = SessionStore::with_default_idle_timeout();
        let id = store.create(SessionId::new("s1"));
        store.push(&id, serde_json::json!({"x": 1}));
    }

    #[test]
    fn subscriber_receives_pushed_event_with_assigned_id() {
        let store = SessionStore::with_default_idle_timeout();
        let id = store.create(SessionId::new("s1"));
        let mut rx = store.subscribe(&id).unwrap();
        store.push(&id, serde_json::json!({"x": 1}));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.id, 1);
        assert_eq!(event.body["x"], 1);
    }

    #[test]
    fn broadcast_all_reaches_every_session_with_distinct_ids() {
        let store = SessionStore::with_default_idle_timeout();
        let a = store.create(SessionId::new("s1"));
        let b = store.create(SessionId::new("s2"));
        let mut rx_a = store.subscribe(&a).unwrap();
        let mut rx_b = store.subscribe(&b).unwrap();

        store.broadcast_all(serde_json::json!({"method": "notifications/tools/list_changed"}));

        assert_eq!(rx_a.try_recv().unwrap().id, 1);
        assert_eq!(rx_b.try_recv().unwrap().id, 1);
    }

    #[test]
    fn reap_idle_removes_only_expired_sessions() {
        let store = SessionStore::new(ChronoDuration::milliseconds(0));
        let id = store.create(SessionId::new("s1"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        let reaped = store.reap_idle();
        assert_eq!(reaped, vec![id]);
        assert_eq!(store.count(), 0);
    }
}
