//! Periodic idle-session reaping: a session with no open SSE stream past
//! the idle window is torn down and its channel view released (spec §3
//! "live until explicit termination or a configurable idle timeout").

use crate::state::AppState;
use photon_subscribe::Backend;
use std::time::Duration;

const REAP_INTERVAL: Duration = Duration::from_secs(30);

pub fn spawn_idle_reaper<B: Backend>(state: AppState<B>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REAP_INTERVAL);
        loop {
            interval.tick().await;
            for session_id in state.sessions.reap_idle() {
                state.subscriptions.release_session(&session_id).await;
            }
        }
    })
}
