//! Registry of cancellation tokens for in-flight invocations, keyed by
//! `(session, request id)` so a `$/cancelRequest` notification can reach the
//! right call (spec §4.2 Cancellation).

use parking_lot::Mutex;
use photon_core::{CancellationToken, SessionId};
use std::collections::HashMap;

fn request_key(session: &SessionId, request_id: &serde_json::Value) -> (SessionId, String) {
    (session.clone(), request_id.to_string())
}

#[derive(Default)]
pub struct CancelRegistry {
    tokens: Mutex<HashMap<(SessionId, String), CancellationToken>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for the duration of one invocation; callers must
    /// `unregister` once the call completes so the map does not grow
    /// unbounded.
    pub fn register(&self, session: &SessionId, request_id: &serde_json::Value, token: CancellationToken) {
        self.tokens.lock().insert(request_key(session, request_id), token);
    }

    pub fn unregister(&self, session: &SessionId, request_id: &serde_json::Value) {
        self.tokens.lock().remove(&request_key(session, request_id));
    }

    /// Idempotent: cancelling an unknown or already-finished request id is
    /// a silent no-op (spec §5 "Cancellation is idempotent").
    pub fn cancel(&self, session: &SessionId, request_id: &serde_json::Value) {
        if let Some(token) = self.tokens.lock().get(&request_key(session, request_id)) {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_marks_registered_token() {
        let registry = CancelRegistry::new();
        let session = SessionId::new("s1");
        let id = serde_json::json!(7);
        let token = CancellationToken::new();
        registry.register(&session, &id, token.clone());

        registry.cancel(&session, &id);
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_of_unknown_request_is_a_no_op() {
        let registry = CancelRegistry::new();
        registry.cancel(&SessionId::new("s1"), &serde_json::json!(1));
    }

    #[test]
    fn unregister_stops_future_cancels_from_reaching_a_reused_id() {
        let registry = CancelRegistry::new();
        let session = SessionId::new("s1");
        let id = serde_json::json!(1);
        let first = CancellationToken::new();
        registry.register(&session, &id, first.clone());
        registry.unregister(&session, &id);

        let second = CancellationToken::new();
        registry.register(&session, &id, second.clone());
        registry.cancel(&session, &id);

        assert!(!first.is_cancelled());
        assert!(second.is_cancelled());
    }
}
