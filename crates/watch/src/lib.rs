//! The filesystem and configuration watcher pipelines (spec §4.5).

pub mod config_watch;
pub mod debounce;
pub mod fs_watch;

pub use config_watch::{diff_mcp_servers, ConfigWatcher, ServerChange, CONFIG_DEBOUNCE};
pub use debounce::Debouncer;
pub use fs_watch::{is_ignored, map_path_to_photon, PhotonFsWatcher, WatchError, FS_DEBOUNCE};
