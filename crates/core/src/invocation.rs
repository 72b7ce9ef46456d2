//! The per-call execution context threaded through Registry.Invoke and the
//! federation client (spec §4.1 Invoke, §4.2 `tools/call`, §4.4 Invoke).

use crate::cancel::CancellationToken;
use crate::error::ControlPlaneError;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// One progress/status/log event yielded by a running invocation, or its
/// terminal outcome.
#[derive(Debug, Clone)]
pub enum InvocationEvent {
    Progress(Value),
    Status(Value),
    Log(Value),
    Result(Value),
    Error(ControlPlaneError),
    Cancelled,
}

/// Sink half of the yield channel: an invocation pushes events here and the
/// caller forwards them to the session's SSE stream and the associated
/// channel ring (spec §4.2 "the call's yield sink forwards to both").
pub type EventSink = mpsc::Sender<InvocationEvent>;

/// A single pending elicitation request, correlated by request id (spec
/// §4.2 "elicitation/create ... correlated by request id").
pub struct ElicitationRequest {
    pub prompt: Value,
    pub reply: oneshot::Sender<Value>,
}

/// Callback an invocation uses to ask the invoking client a question
/// mid-call. Returns `ElicitationUnavailable` when the session has no
/// attached stream (spec §4.6).
pub type AskSink = mpsc::Sender<ElicitationRequest>;

/// Everything a method invocation needs beyond its arguments: somewhere to
/// yield events, somewhere to ask questions, and a token to observe
/// cancellation at its own await points.
#[derive(Clone)]
pub struct InvocationContext {
    pub events: EventSink,
    pub ask: Option<AskSink>,
    pub cancellation: CancellationToken,
}

impl InvocationContext {
    pub fn new(events: EventSink, ask: Option<AskSink>, cancellation: CancellationToken) -> Self {
        Self { events, ask, cancellation }
    }

    pub async fn ask(&self, prompt: Value) -> Result<Value, ControlPlaneError> {
        let Some(ask) = &self.ask else {
            return Err(ControlPlaneError::ElicitationUnavailable);
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        ask.send(ElicitationRequest { prompt, reply: reply_tx })
            .await
            .map_err(|_| ControlPlaneError::ElicitationUnavailable)?;
        reply_rx.await.map_err(|_| ControlPlaneError::ElicitationUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ask_without_sink_is_unavailable() {
        let (tx, _rx) = mpsc::channel(1);
        let ctx = InvocationContext::new(tx, None, CancellationToken::new());
        let err = ctx.ask(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ControlPlaneError::ElicitationUnavailable));
    }

    #[tokio::test]
    async fn ask_round_trips_through_reply_channel() {
        let (events_tx, _events_rx) = mpsc::channel(1);
        let (ask_tx, mut ask_rx) = mpsc::channel(1);
        let ctx = InvocationContext::new(events_tx, Some(ask_tx), CancellationToken::new());

        let responder = tokio::spawn(async move {
            let req = ask_rx.recv().await.unwrap();
            req.reply.send(serde_json::json!({"answer": 42})).unwrap();
        });

        let answer = ctx.ask(serde_json::json!({"question": "?"})).await.unwrap();
        assert_eq!(answer["answer"], 42);
        responder.await.unwrap();
    }
}
