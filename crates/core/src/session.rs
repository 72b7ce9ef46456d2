//! Session model (spec §3 "Session").

use crate::id::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// What a session is currently viewing, i.e. which channel it is subscribed
/// to (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub photon_id: String,
    pub item_id: String,
}

impl ViewState {
    pub fn channel_key(&self) -> String {
        format!("{}:{}", self.photon_id, self.item_id)
    }
}

/// A session's place in the streamable-transport state machine (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    Uninitialized,
    Initialized,
    Terminated,
}

/// A logical client of the streaming endpoint (spec §3 "Session").
///
/// `next_event_id` is the monotonic counter for SSE event ids scoped to this
/// session (spec §8 property 3: monotonic except across replay windows,
/// which this type does not itself special-case — the transport resets
/// nothing, it only ever increments).
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub phase: SessionPhase,
    pub view: Option<ViewState>,
    next_event_id: AtomicU64,
}

impl Session {
    pub fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            last_seen: now,
            phase: SessionPhase::Uninitialized,
            view: None,
            next_event_id: AtomicU64::new(1),
        }
    }

    /// Assign the next event id for this session. Event id 0 is never
    /// assigned (spec §3 Channel invariant mirrored at the session level).
    pub fn next_event_id(&self) -> u64 {
        self.next_event_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen = now;
    }

    pub fn is_idle(&self, now: DateTime<Utc>, idle_timeout: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_seen) > idle_timeout
    }
}
