//! The error taxonomy from spec §7, reported on the wire as a structured
//! JSON-RPC error whose `data.kind` carries the variant name.

use serde::Serialize;
use thiserror::Error;

/// Kinds of error the control plane can surface to a calling session.
///
/// Every variant maps 1:1 to a row of spec §7's table; `kind_name` is the
/// exact string placed in the JSON-RPC error's `data.kind` field.
#[derive(Debug, Error, Clone, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum ControlPlaneError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unconfigured: missing {missing:?}")]
    Unconfigured { missing: Vec<String> },

    #[error("load error: {0}")]
    LoadError(String),

    #[error("invocation error: {0}")]
    InvocationError(String),

    #[error("cancelled")]
    Cancelled,

    #[error("elicitation unavailable")]
    ElicitationUnavailable,

    #[error("federated error: {0}")]
    Federated(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ControlPlaneError {
    /// The `data.kind` string placed on the wire.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::Unconfigured { .. } => "Unconfigured",
            Self::LoadError(_) => "LoadError",
            Self::InvocationError(_) => "InvocationError",
            Self::Cancelled => "Cancelled",
            Self::ElicitationUnavailable => "ElicitationUnavailable",
            Self::Federated(_) => "Federated",
            Self::Transport(_) => "Transport",
        }
    }

    /// JSON-RPC 2.0 error code. Application errors use the reserved
    /// `-32000..-32099` "server error" band; `NotFound` reuses the standard
    /// `-32601` ("method not found") since it is the closest JSON-RPC
    /// built-in meaning.
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::NotFound(_) => -32601,
            Self::Unconfigured { .. } => -32001,
            Self::LoadError(_) => -32002,
            Self::InvocationError(_) => -32003,
            Self::Cancelled => -32004,
            Self::ElicitationUnavailable => -32005,
            Self::Federated(_) => -32006,
            Self::Transport(_) => -32007,
        }
    }

    /// Truncate an upstream message to the 200-character bound used
    /// throughout spec §4 and §6 for surfaced error messages.
    pub fn truncate_message(message: &str) -> String {
        const MAX: usize = 200;
        if message.chars().count() <= MAX {
            message.to_string()
        } else {
            message.chars().take(MAX).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_two_hundred_chars() {
        let long = "x".repeat(500);
        let truncated = ControlPlaneError::truncate_message(&long);
        assert_eq!(truncated.chars().count(), 200);
    }

    #[test]
    fn short_message_is_unchanged() {
        assert_eq!(ControlPlaneError::truncate_message("short"), "short");
    }

    #[test]
    fn kind_name_matches_each_variant() {
        assert_eq!(ControlPlaneError::NotFound("x".into()).kind_name(), "NotFound");
        assert_eq!(ControlPlaneError::Cancelled.kind_name(), "Cancelled");
        assert_eq!(
            ControlPlaneError::Unconfigured { missing: vec!["token".into()] }.kind_name(),
            "Unconfigured"
        );
    }
}
