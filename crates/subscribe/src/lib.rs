//! Channel subscriptions and bounded replay (spec §4.3).

pub mod backend;
pub mod manager;

pub use backend::{Backend, BackendError, BackendMessage, InProcessBackend};
pub use manager::{SessionSink, SubscriptionManager};

#[cfg(any(test, feature = "test-support"))]
pub use backend::FakeBackend;
