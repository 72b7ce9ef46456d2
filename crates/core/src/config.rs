//! The configuration envelope (spec §3 "Configuration envelope", §6, §8 #7-8).

use crate::external::ExternalServerTransport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// On-disk/in-memory shape of the configuration file.
///
/// `{"photons": {name: {envVar: value}}, "mcpServers": {name: serverConfig}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigEnvelope {
    #[serde(default)]
    pub photons: HashMap<String, HashMap<String, String>>,
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: HashMap<String, ExternalServerTransport>,
}

impl ConfigEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_photon_env(&mut self, photon: &str, env: HashMap<String, String>) {
        self.photons.entry(photon.to_string()).or_default().extend(env);
    }

    pub fn remove_photon(&mut self, photon: &str) {
        self.photons.remove(photon);
    }

    /// Render as pretty-printed JSON; round-tripping `parse` . `to_pretty_json`
    /// must be idempotent byte-for-byte (spec §8 property 7).
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse either the current nested shape or the legacy flat shape
    /// `{name: {envVar: value}}` (spec §3 invariant, §8 property 8), treating
    /// the whole flat map as the `photons` namespace with no `mcpServers`.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let is_legacy = value
            .as_object()
            .map(|obj| !obj.contains_key("photons") && !obj.contains_key("mcpServers"))
            .unwrap_or(false);

        if is_legacy {
            let photons: HashMap<String, HashMap<String, String>> =
                serde_json::from_value(value)?;
            return Ok(Self { photons, mcp_servers: HashMap::new() });
        }

        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_idempotent() {
        let mut env = ConfigEnvelope::new();
        env.merge_photon_env("demo", HashMap::from([("DEMO_TOKEN".to_string(), "abc".to_string())]));
        let once = env.to_pretty_json().unwrap();
        let parsed = ConfigEnvelope::parse(&once).unwrap();
        let twice = parsed.to_pretty_json().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn legacy_flat_envelope_migrates_to_nested_shape() {
        // Legacy shape: {name: {envVar: value}}, with no wrapping
        // "photons"/"mcpServers" keys.
        let legacy = r#"{"demo": {"DEMO_TOKEN": "x"}}"#;
        let parsed = ConfigEnvelope::parse(legacy).unwrap();
        assert_eq!(parsed.photons["demo"]["DEMO_TOKEN"], "x");
        assert!(parsed.mcp_servers.is_empty());
    }

    #[test]
    fn nested_shape_parses_directly() {
        let nested = r#"{"photons": {"demo": {"DEMO_TOKEN": "x"}}, "mcpServers": {}}"#;
        let parsed = ConfigEnvelope::parse(nested).unwrap();
        assert_eq!(parsed.photons["demo"]["DEMO_TOKEN"], "x");
    }
}
