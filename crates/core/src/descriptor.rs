//! The photon descriptor and its nested types (spec §3 "Photon descriptor").

use crate::id::PhotonId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Declared type of a constructor configuration parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

/// One declared constructor configuration parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigParam {
    pub name: String,
    pub env_key: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub optional: bool,
    pub has_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ConfigParam {
    /// Does this value look like an unfilled placeholder per spec §4.1?
    ///
    /// A default is a placeholder if it contains `<`, `your-`, `localhost`,
    /// or `127.0.0.1`.
    pub fn default_is_placeholder(&self) -> bool {
        let Some(serde_json::Value::String(s)) = &self.default else {
            return false;
        };
        s.contains('<') || s.contains("your-") || s.contains("localhost") || s.contains("127.0.0.1")
    }

    /// Whether this parameter blocks the photon from reaching `ready`
    /// (spec §4.1 Pre-check), given that `env_key` is or isn't set.
    pub fn is_unsatisfied(&self, env_is_set: bool) -> bool {
        if env_is_set {
            return false;
        }
        let required_and_unset = !self.optional && !self.has_default;
        let placeholder_default = self.has_default && self.default_is_placeholder();
        required_and_unset || placeholder_default
    }
}

/// Where a method may be invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Model,
    App,
}

/// One exposed method on a photon instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub input_schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub layout_hints: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_ui: Option<String>,
    pub visibility: Vec<Visibility>,
    pub autorun: bool,
    pub is_test: bool,
    pub is_template: bool,
}

impl MethodDescriptor {
    /// A method the registry must never auto-invoke (spec §4.1 edge cases):
    /// test methods (name begins with `test`) and template-only methods.
    pub fn is_auto_invocable(&self) -> bool {
        !self.is_test && !self.is_template
    }
}

/// Extracted class-level metadata (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_ui_template: Option<String>,
}

/// Lifecycle state of a photon (spec §3 invariant: every live handle has a
/// descriptor with `state = Ready`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum PhotonState {
    NeedsConfig { missing: Vec<String> },
    Ready,
    Errored { message: String },
}

impl PhotonState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Stable, addressable description of one photon, independent of whether it
/// is currently loaded (spec §3 "Photon descriptor").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotonDescriptor {
    pub id: PhotonId,
    pub name: String,
    pub path: PathBuf,
    pub state: PhotonState,
    pub config_params: Vec<ConfigParam>,
    pub methods: Vec<MethodDescriptor>,
    /// Name of the method serving as the app entry (conventionally `main`),
    /// if the photon declares a linked UI for it.
    pub app_entry: Option<String>,
    pub metadata: ClassMetadata,
    pub resource_count: usize,
    pub prompt_count: usize,
    pub dependencies: Vec<String>,
}

impl PhotonDescriptor {
    /// Fully-qualified method lookup, matching the wire naming
    /// `<photon-name>.<method>` used by spec §4.2 `tools/call` routing.
    pub fn find_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn is_app(&self) -> bool {
        self.app_entry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(optional: bool, has_default: bool, default: Option<&str>) -> ConfigParam {
        ConfigParam {
            name: "token".into(),
            env_key: "DEMO_TOKEN".into(),
            param_type: ParamType::String,
            optional,
            has_default,
            default: default.map(|s| serde_json::Value::String(s.into())),
        }
    }

    #[test]
    fn required_unset_param_is_unsatisfied() {
        let p = param(false, false, None);
        assert!(p.is_unsatisfied(false));
        assert!(!p.is_unsatisfied(true));
    }

    #[test]
    fn optional_unset_param_is_satisfied() {
        let p = param(true, false, None);
        assert!(!p.is_unsatisfied(false));
    }

    #[test]
    fn placeholder_default_is_unsatisfied_until_env_set() {
        let p = param(false, true, Some("https://<your-token>"));
        assert!(p.default_is_placeholder());
        assert!(p.is_unsatisfied(false));
        assert!(!p.is_unsatisfied(true));
    }

    #[test]
    fn real_default_is_satisfied_without_env() {
        let p = param(false, true, Some("anonymous"));
        assert!(!p.default_is_placeholder());
        assert!(!p.is_unsatisfied(false));
    }

    #[test]
    fn localhost_default_is_placeholder() {
        let p = param(false, true, Some("http://localhost:8080"));
        assert!(p.default_is_placeholder());
    }
}
