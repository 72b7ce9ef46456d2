//! Environment variable access used by pre-check, Configure, and load
//! backfill (spec §4.1, §5 "Shared resources": "only the registry writes
//! them, and only during Configure and backfill, both on the main task").

use parking_lot::Mutex;
use std::collections::HashMap;

pub trait EnvAccessor: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// The real process environment.
#[derive(Debug, Default)]
pub struct ProcessEnv;

impl EnvAccessor for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn set(&self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }
}

/// An in-memory environment for deterministic tests, avoiding mutation of
/// the real process environment (which is process-global and would make
/// tests order-dependent).
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct FakeEnv {
    vars: Mutex<HashMap<String, String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self { vars: Mutex::new(pairs.into_iter().collect()) }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl EnvAccessor for FakeEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.vars.lock().insert(key.to_string(), value.to_string());
    }
}
