//! The federation layer: a catalog of external tool servers reachable over
//! stdio or streaming-HTTP (with legacy SSE fallback), mapped into the same
//! method-descriptor shape photons use (spec §4.4).

pub mod catalog;
pub mod client;
pub mod error;
pub mod sse;

pub use catalog::{ClientFactory, DefaultClientFactory, FederationCatalog};
pub use client::{ExternalClient, FakeExternalClient, HttpExternalClient, ResourceInfo, StdioExternalClient};
pub use error::FederationError;
