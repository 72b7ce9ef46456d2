//! Federation-local error type, mapped onto [`photon_core::ControlPlaneError::Federated`]
//! at the boundary (spec §4.4, §7 "Federated").

use photon_core::ControlPlaneError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum FederationError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),
    #[error("not connected: {0}")]
    NotConnected(String),
    #[error("unknown server: {0}")]
    UnknownServer(String),
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<FederationError> for ControlPlaneError {
    fn from(err: FederationError) -> Self {
        match &err {
            FederationError::UnknownServer(name) => ControlPlaneError::NotFound(name.clone()),
            other => ControlPlaneError::Federated(ControlPlaneError::truncate_message(&other.to_string())),
        }
    }
}
