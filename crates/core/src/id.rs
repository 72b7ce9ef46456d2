//! Identifier types shared across the control plane.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Stable identity of a photon: the first 12 hex characters of
    /// SHA-256(absolute path).
    pub struct PhotonId;
}

define_id! {
    /// Identity of an external tool server: hash of `"external:" + name`.
    pub struct ExternalServerId;
}

define_id! {
    /// Opaque session identifier handed out at `initialize`.
    pub struct SessionId;
}

/// Number of hex characters kept from the SHA-256 digest for a [`PhotonId`].
const ID_PREFIX_LEN: usize = 12;

impl PhotonId {
    /// Derive the stable id of a photon from its absolute path.
    ///
    /// `path` should already be canonicalized; the id is a pure function of
    /// the bytes handed in, so relative paths or differently-cased drive
    /// letters would silently produce different ids.
    pub fn from_path(path: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        let digest = hasher.finalize();
        let hex = hex_encode(&digest);
        Self(hex[..ID_PREFIX_LEN].to_string())
    }
}

impl ExternalServerId {
    /// Derive the stable id of an external server from its name.
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"external:");
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        let hex = hex_encode(&digest);
        Self(hex[..ID_PREFIX_LEN].to_string())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
