//! Daemon configuration: resolved once at startup from environment
//! variables with the same override-chain idiom the teacher uses for its
//! state directory (`OJ_STATE_DIR` > `XDG_STATE_HOME` > `~/.local/state`).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot resolve a home directory and no PHOTON_STATE_DIR override is set")]
    NoStateDir,
}

/// Daemon configuration, resolved from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. `~/.local/state/photon`).
    pub state_dir: PathBuf,
    /// Path to the daemon log file.
    pub log_path: PathBuf,
    /// Path to the single-instance lock/PID file.
    pub lock_path: PathBuf,
    /// Path to the configuration envelope (spec §6).
    pub config_path: PathBuf,
    /// Directory photons are discovered from (spec §4.1 "List roots").
    pub working_dir: PathBuf,
    /// Bundled photon roots shipped alongside the daemon, searched after
    /// (and overridable by) `working_dir`.
    pub bundled_roots: Vec<PathBuf>,
    /// Bind host for the streamable transport.
    pub bind_host: String,
    /// First port to probe; `PORT_PROBE_ATTEMPTS` consecutive ports are
    /// tried before startup fails (spec §6 "bind failure after
    /// port-probe exhaustion").
    pub bind_port: u16,
}

/// Number of consecutive ports probed before giving up (spec §6).
pub const PORT_PROBE_ATTEMPTS: u16 = 32;

/// Default first port probed, chosen to avoid well-known service ports.
const DEFAULT_PORT: u16 = 4173;

impl Config {
    /// Load configuration for the user-level daemon.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = state_dir()?;
        let working_dir = std::env::var("PHOTON_WORKING_DIR")
            .map(PathBuf::from)
            .or_else(|_| std::env::current_dir())
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Self {
            log_path: state_dir.join("daemon.log"),
            lock_path: state_dir.join("daemon.pid"),
            config_path: std::env::var("PHOTON_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| photon_storage::default_config_path()),
            working_dir,
            bundled_roots: bundled_roots(),
            bind_host: std::env::var("PHOTON_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            bind_port: std::env::var("PHOTON_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            state_dir,
        })
    }
}

/// Resolve the state directory: `PHOTON_STATE_DIR` > `XDG_STATE_HOME/photon`
/// > `~/.local/state/photon`.
fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("PHOTON_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("photon"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/photon"))
}

/// `PHOTON_BUNDLED_ROOTS` is a `:`-separated list of extra photon
/// directories searched in addition to `working_dir` (spec §4.1 "List
/// roots": bundled paths, user directory wins on collision).
fn bundled_roots() -> Vec<PathBuf> {
    std::env::var("PHOTON_BUNDLED_ROOTS")
        .map(|raw| raw.split(':').filter(|s| !s.is_empty()).map(PathBuf::from).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn state_dir_prefers_explicit_override() {
        std::env::set_var("PHOTON_STATE_DIR", "/tmp/photon-explicit");
        std::env::remove_var("XDG_STATE_HOME");
        let config = Config::load().unwrap();
        assert_eq!(config.state_dir, PathBuf::from("/tmp/photon-explicit"));
        std::env::remove_var("PHOTON_STATE_DIR");
    }

    #[test]
    #[serial]
    fn bundled_roots_splits_colon_separated_list() {
        std::env::set_var("PHOTON_BUNDLED_ROOTS", "/a/b:/c/d");
        assert_eq!(bundled_roots(), vec![PathBuf::from("/a/b"), PathBuf::from("/c/d")]);
        std::env::remove_var("PHOTON_BUNDLED_ROOTS");
    }

    #[test]
    #[serial]
    fn bundled_roots_is_empty_when_unset() {
        std::env::remove_var("PHOTON_BUNDLED_ROOTS");
        assert!(bundled_roots().is_empty());
    }
}
