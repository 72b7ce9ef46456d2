//! Photon discovery, pre-check, load/reload, configuration, and invocation
//! (spec §4.1 "Registry").

pub mod discover;
pub mod env;
pub mod loader;
pub mod registry;

pub use discover::{list_roots, PhotonCandidate};
pub use env::{EnvAccessor, ProcessEnv};
#[cfg(any(test, feature = "test-support"))]
pub use env::FakeEnv;
pub use loader::{default_worker_command, LoadedModule, LoaderError, PhotonLoader, SubprocessPhotonLoader};
pub use registry::Registry;
