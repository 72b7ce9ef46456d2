//! Durable persistence for the photon control plane: the configuration
//! envelope is the only artifact on disk (spec §5 "Shared resources"); all
//! other state is in-memory and rebuilt from it at startup.

pub mod config_store;
pub mod paths;

pub use config_store::{ConfigStore, ConfigStoreError};
pub use paths::default_config_path;
