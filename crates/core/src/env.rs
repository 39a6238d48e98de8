//! Environment-variable access as an injectable dependency.
//!
//! Business logic never calls `std::env::var` directly; it takes a
//! `&dyn EnvSource` so tests can supply a fake environment instead of
//! mutating the process environment.

use std::collections::HashMap;

/// A source of environment variables.
pub trait EnvSource: Send + Sync {
    /// Look up a variable by name, returning `None` if it is unset.
    fn get(&self, key: &str) -> Option<String>;
}

/// `EnvSource` backed by the real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed, in-memory `EnvSource`, used in tests.
#[derive(Debug, Default, Clone)]
pub struct FakeEnv {
    vars: HashMap<String, String>,
}

impl FakeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvSource for FakeEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
