//! Wiring for the photon control plane daemon (`photond`): configuration,
//! logging setup, and construction of the registry/federation/subscription/
//! watcher/transport stack (spec §6 "Startup").

pub mod config;
pub mod lock;
pub mod logging;
pub mod wiring;

pub use config::Config;
pub use wiring::{build, Daemon, WiringError};
