//! Atomic persistence of the configuration envelope (spec §5 "Shared
//! resources", §6 "Configuration file").

use photon_core::ConfigEnvelope;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Owns the on-disk configuration file and writes it atomically.
///
/// Reads tolerate the file being briefly absent during another writer's
/// rename window (spec §5): a missing file is treated as an empty
/// envelope rather than an error.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the envelope, auto-migrating the legacy flat shape in memory.
    /// A missing file yields an empty envelope; a present-but-unparseable
    /// file is an error (the daemon refuses to start rather than silently
    /// discard configuration, per spec §6 exit-status rules).
    pub fn load(&self) -> Result<ConfigEnvelope, ConfigStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(ConfigEnvelope::parse(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ConfigEnvelope::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the envelope via temp-file-then-rename so concurrent readers
    /// never observe a partially-written file (spec §5).
    pub fn save(&self, envelope: &ConfigEnvelope) -> Result<(), ConfigStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        let rendered = envelope.to_pretty_json()?;
        fs::write(&tmp_path, rendered.as_bytes())?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Load, migrate the legacy shape if present, and immediately persist
    /// the migrated nested shape so subsequent watcher diffs see it in its
    /// canonical form (spec §3 invariant, §8 property 8).
    pub fn load_and_migrate(&self) -> Result<ConfigEnvelope, ConfigStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ConfigEnvelope::new()),
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let was_legacy = value
            .as_object()
            .map(|obj| !obj.contains_key("photons") && !obj.contains_key("mcpServers"))
            .unwrap_or(false);

        let envelope = ConfigEnvelope::from_value(value)?;
        if was_legacy {
            warn!(path = %self.path.display(), "migrating legacy flat configuration envelope");
            self.save(&envelope)?;
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_empty_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        let env = store.load().unwrap();
        assert!(env.photons.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        let mut env = ConfigEnvelope::new();
        env.merge_photon_env("demo", HashMap::from([("DEMO_TOKEN".into(), "x".into())]));
        store.save(&env).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, env);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        store.save(&ConfigEnvelope::new()).unwrap();
        assert!(!dir.path().join("config.tmp").exists());
        assert!(dir.path().join("config.json").exists());
    }

    #[test]
    fn load_and_migrate_persists_nested_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"demo": {"DEMO_TOKEN": "x"}}"#).unwrap();

        let store = ConfigStore::new(&path);
        let migrated = store.load_and_migrate().unwrap();
        assert_eq!(migrated.photons["demo"]["DEMO_TOKEN"], "x");

        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("\"photons\""));
    }

    #[test]
    fn load_and_migrate_is_noop_for_nested_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let nested = r#"{"photons": {"demo": {"DEMO_TOKEN": "x"}}, "mcpServers": {}}"#;
        fs::write(&path, nested).unwrap();

        let store = ConfigStore::new(&path);
        store.load_and_migrate().unwrap();
        let on_disk = fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, nested);
    }
}
