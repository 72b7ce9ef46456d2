//! Channel and its bounded replay ring (spec §3 "Channel", §4.3, §8 #6).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of buffered events per channel (spec §3, §8 property 6).
pub const RING_CAPACITY: usize = 30;

/// One event published on a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub id: u64,
    pub method: String,
    pub params: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Outcome of [`ChannelRing::replay_from`], matching spec §4.3 Observe and
/// §8 property 5.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Every buffered event with id greater than the requested id, in id
    /// order (may be empty if the requester is already caught up).
    Replay(Vec<ChannelEvent>),
    /// The requested id is older than the oldest buffered event: the
    /// replay window has been exceeded and the caller should send
    /// `refresh-needed` instead of partial replay.
    RefreshNeeded,
}

/// The bounded event ring and reference count for one `<photon-id>:<item-id>`
/// channel.
pub struct ChannelRing {
    ring: VecDeque<ChannelEvent>,
    next_local_id: u64,
    ref_count: usize,
}

impl Default for ChannelRing {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRing {
    pub fn new() -> Self {
        Self {
            ring: VecDeque::with_capacity(RING_CAPACITY),
            next_local_id: 1,
            ref_count: 0,
        }
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    pub fn incref(&mut self) -> usize {
        self.ref_count += 1;
        self.ref_count
    }

    /// Returns the new ref count.
    pub fn decref(&mut self) -> usize {
        self.ref_count = self.ref_count.saturating_sub(1);
        self.ref_count
    }

    /// Assign the next id, append to the ring, trimming to [`RING_CAPACITY`].
    pub fn publish(&mut self, method: impl Into<String>, params: serde_json::Value) -> ChannelEvent {
        let event = ChannelEvent {
            id: self.next_local_id,
            method: method.into(),
            params,
            timestamp: chrono::Utc::now(),
        };
        self.next_local_id += 1;
        if self.ring.len() >= RING_CAPACITY {
            self.ring.pop_front();
        }
        self.ring.push_back(event.clone());
        event
    }

    pub fn oldest_id(&self) -> Option<u64> {
        self.ring.front().map(|e| e.id)
    }

    /// Replay semantics of spec §4.3 / §8 property 5: if `last_event_id` is
    /// older than the oldest buffered event, the replay window has been
    /// exceeded; otherwise every event with id strictly greater is
    /// returned in id order.
    pub fn replay_from(&self, last_event_id: Option<u64>) -> ReplayOutcome {
        let Some(last) = last_event_id else {
            return ReplayOutcome::Replay(self.ring.iter().cloned().collect());
        };

        match self.oldest_id() {
            Some(oldest) if oldest > last => ReplayOutcome::RefreshNeeded,
            _ => ReplayOutcome::Replay(
                self.ring.iter().filter(|e| e.id > last).cloned().collect(),
            ),
        }
    }
}
