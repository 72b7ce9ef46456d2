//! The well-known on-disk locations (spec §6 "Configuration file").

use std::path::PathBuf;

/// `~/.photon/config.json`, falling back to a relative `.photon/config.json`
/// if the home directory cannot be resolved.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".photon")
        .join("config.json")
}
