//! Access to the process environment.
//!
//! Everything that reads an environment variable goes through the
//! [`Environment`] trait so request parsing and dispatch can be exercised
//! with a fixed set of variables instead of the real process environment.

use std::collections::HashMap;

/// Per-user runtime directory holding the service sockets.
pub const RUNTIME_DIR: &str = "XDG_RUNTIME_DIR";
/// Identifier of the running compositor instance.
pub const INSTANCE_SIGNATURE: &str = "HYPRLAND_INSTANCE_SIGNATURE";
/// Display token the discovery broker filters candidates on.
pub const DISPLAY_TOKEN: &str = "WAYLAND_DISPLAY";
pub const HOME: &str = "HOME";
pub const CONFIG_HOME: &str = "XDG_CONFIG_HOME";

/// Read-only view of environment variables.
#[cfg_attr(test, mockall::automock)]
pub trait Environment {
    /// Returns the value of `key`; unset and empty variables are both `None`.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.is_empty())
    }
}

/// A fixed set of variables, for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct EnvironmentMap {
    vars: HashMap<String, String>,
}

impl EnvironmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a variable.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl Environment for EnvironmentMap {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).filter(|value| !value.is_empty()).cloned()
    }
}

impl<E: Environment + ?Sized> Environment for &E {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}
