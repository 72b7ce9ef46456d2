//! External tool-server descriptor (spec §3 "External server descriptor",
//! §4.4 Federation layer).

use crate::descriptor::MethodDescriptor;
use crate::id::ExternalServerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// How to reach an external tool server, as read from the `mcpServers`
/// section of the configuration envelope (spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalServerTransport {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default)]
        cwd: Option<PathBuf>,
    },
    Url {
        url: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalServerDescriptor {
    pub id: ExternalServerId,
    pub name: String,
    pub config: ExternalServerTransport,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub methods: Vec<MethodDescriptor>,
    pub resource_count: usize,
    pub is_app: bool,
    pub app_resource_uris: Vec<String>,
}

impl ExternalServerDescriptor {
    pub fn new(name: &str, config: ExternalServerTransport) -> Self {
        Self {
            id: ExternalServerId::from_name(name),
            name: name.to_string(),
            config,
            connected: false,
            error_message: None,
            methods: Vec::new(),
            resource_count: 0,
            is_app: false,
            app_resource_uris: Vec::new(),
        }
    }

    /// Promote to app when a resource's URI or MIME type marks it as a UI
    /// surface (spec §4.4: `ui://` scheme or the UI-app MIME type).
    pub fn note_resource(&mut self, uri: &str, mime_type: Option<&str>) {
        const UI_APP_MIME: &str = "text/html+skybridge";
        if uri.starts_with("ui://") || mime_type == Some(UI_APP_MIME) {
            self.is_app = true;
            self.app_resource_uris.push(uri.to_string());
        }
        self.resource_count += 1;
    }
}
