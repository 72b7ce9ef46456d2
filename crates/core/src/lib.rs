//! Shared domain types for the photon control plane: identifiers, the
//! photon and external-server descriptors, channels, sessions, the
//! configuration envelope, and the JSON-RPC wire types built on top of them.
//!
//! Downstream crates (`photon-storage`, `photon-registry`, `photon-federation`,
//! `photon-subscribe`, `photon-watch`, `photon-transport`, `photon-daemon`)
//! depend on this crate and do not redefine any of these types.

pub mod cancel;
pub mod channel;
pub mod config;
pub mod descriptor;
pub mod env_name;
pub mod error;
pub mod external;
pub mod id;
pub mod invocation;
pub mod rpc;
pub mod session;

pub use cancel::CancellationToken;
pub use channel::{ChannelEvent, ChannelRing, ReplayOutcome, RING_CAPACITY};
pub use config::ConfigEnvelope;
pub use descriptor::{
    ClassMetadata, ConfigParam, MethodDescriptor, ParamType, PhotonDescriptor, PhotonState,
    Visibility,
};
pub use env_name::to_env_var_name;
pub use error::ControlPlaneError;
pub use external::{ExternalServerDescriptor, ExternalServerTransport};
pub use id::{ExternalServerId, PhotonId, SessionId};
pub use invocation::{AskSink, ElicitationRequest, EventSink, InvocationContext, InvocationEvent};
pub use rpc::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
pub use session::{Session, SessionPhase, ViewState};
