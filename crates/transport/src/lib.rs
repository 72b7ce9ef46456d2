//! The streamable HTTP+SSE transport: session lifecycle, JSON-RPC method
//! dispatch, and the single `/mcp` endpoint (spec §4.2).

pub mod cancel_registry;
pub mod dispatch;
pub mod reaper;
pub mod router;
pub mod session;
pub mod state;

pub use cancel_registry::CancelRegistry;
pub use reaper::spawn_idle_reaper;
pub use router::build_router;
pub use session::{OutboundEvent, SessionStore};
pub use state::{AppState, ElicitationTable, TransportSessionSink};
