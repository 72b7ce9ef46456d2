//! JSON-RPC 2.0 envelope types shared by the transport and federation
//! layers (spec §6 "Streaming endpoint").
//!
//! Hand-rolled rather than pulled from an MCP SDK crate: the wire surface in
//! spec §6 adds control-plane-specific methods (`$/cancelRequest`,
//! `channel-event`, `refresh-needed`) on top of the JSON-RPC 2.0 base, so a
//! plain serde model (as in a hand-rolled Streamable-HTTP transport) is a
//! better fit than a fixed protocol SDK. See DESIGN.md.

use serde::{Deserialize, Serialize};

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    /// Absent for notifications (`$/cancelRequest`, etc.).
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, result: Some(result), error: None, id }
    }

    pub fn error(
        id: Option<serde_json::Value>,
        code: i64,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data }),
            id,
        }
    }

    pub fn from_control_plane_error(
        id: Option<serde_json::Value>,
        err: &crate::error::ControlPlaneError,
    ) -> Self {
        let data = serde_json::json!({ "kind": err.kind_name() });
        Self::error(id, err.rpc_code(), err.to_string(), Some(data))
    }
}

/// A server-to-client JSON-RPC notification (no `id`).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: serde_json::Value,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, method: method.into(), params }
    }

    pub fn tools_list_changed() -> Self {
        Self::new("notifications/tools/list_changed", serde_json::json!({}))
    }

    pub fn channel_event(channel: &str, event: &crate::channel::ChannelEvent) -> Self {
        Self::new(
            "channel-event",
            serde_json::json!({
                "channel": channel,
                "id": event.id,
                "method": event.method,
                "params": event.params,
            }),
        )
    }

    pub fn refresh_needed(channel: &str) -> Self {
        Self::new("refresh-needed", serde_json::json!({ "channel": channel }))
    }

    pub fn elicitation_create(request_id: &str, prompt: serde_json::Value) -> Self {
        Self::new(
            "elicitation/create",
            serde_json::json!({ "requestId": request_id, "prompt": prompt }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_has_no_id_field_in_json() {
        let n = JsonRpcNotification::tools_list_changed();
        let value = serde_json::to_value(&n).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["method"], "notifications/tools/list_changed");
    }

    #[test]
    fn error_response_carries_kind_in_data() {
        let err = crate::error::ControlPlaneError::Cancelled;
        let resp = JsonRpcResponse::from_control_plane_error(Some(serde_json::json!(1)), &err);
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["error"]["data"]["kind"], "Cancelled");
    }
}
