// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime settings.
//!
//! Resolved once at startup: environment first (see [`crate::env`]), then
//! command-line overrides on top. Nothing reads the environment after this.

use std::path::PathBuf;
use std::time::Duration;

use crate::env;
use crate::rpc::ClientOptions;

/// Registry location relative to `$HOME` when `TOOLSCOUT_REGISTRY` is unset.
pub const DEFAULT_REGISTRY_FILE: &str = ".toolscout/registry.json";
/// Default per-call RPC timeout in milliseconds.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;
/// Default `tools/list` timeout for `describe_mcp` in milliseconds.
pub const DEFAULT_DESCRIBE_TIMEOUT_MS: u64 = 15_000;
/// Default overall script deadline in milliseconds.
pub const DEFAULT_EXEC_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub registry_path: PathBuf,
    pub exec_enabled: bool,
    pub call_timeout: Duration,
    pub describe_timeout: Duration,
    pub exec_timeout: Duration,
}

/// Command-line values that take precedence over the environment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overrides {
    pub registry_path: Option<PathBuf>,
    /// Can only switch execution on, never off.
    pub enable_exec: bool,
    pub call_timeout_ms: Option<u64>,
    pub describe_timeout_ms: Option<u64>,
    pub exec_timeout_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            exec_enabled: false,
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
            describe_timeout: Duration::from_millis(DEFAULT_DESCRIBE_TIMEOUT_MS),
            exec_timeout: Duration::from_millis(DEFAULT_EXEC_TIMEOUT_MS),
        }
    }
}

impl Settings {
    /// Settings from the environment alone.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            registry_path: env::registry_path().unwrap_or(defaults.registry_path),
            exec_enabled: env::exec_enabled(),
            call_timeout: env::call_timeout_ms()
                .map(Duration::from_millis)
                .unwrap_or(defaults.call_timeout),
            describe_timeout: env::describe_timeout_ms()
                .map(Duration::from_millis)
                .unwrap_or(defaults.describe_timeout),
            exec_timeout: env::exec_timeout_ms()
                .map(Duration::from_millis)
                .unwrap_or(defaults.exec_timeout),
        }
    }

    /// Environment settings with `overrides` applied.
    pub fn resolve(overrides: &Overrides) -> Self {
        Self::from_env().with_overrides(overrides)
    }

    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(path) = &overrides.registry_path {
            self.registry_path = path.clone();
        }
        self.exec_enabled |= overrides.enable_exec;
        if let Some(ms) = overrides.call_timeout_ms {
            self.call_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = overrides.describe_timeout_ms {
            self.describe_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = overrides.exec_timeout_ms {
            self.exec_timeout = Duration::from_millis(ms);
        }
        self
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            call_timeout: self.call_timeout,
            ..ClientOptions::default()
        }
    }
}

/// `$HOME/.toolscout/registry.json`, or relative to the working directory
/// when `HOME` is unset.
pub fn default_registry_path() -> PathBuf {
    match env::home() {
        Some(home) => home.join(DEFAULT_REGISTRY_FILE),
        None => PathBuf::from(DEFAULT_REGISTRY_FILE),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
