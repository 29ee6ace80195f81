// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables used by toolscout are defined here.
//! Use these accessors instead of calling `std::env::var()` directly.

/// Generated env var name constants.
mod names {
    include!(concat!(env!("OUT_DIR"), "/env_names.rs"));
}

// Re-export name constants for callers that need the raw name string.
pub use names::*;

use std::path::PathBuf;

/// `TOOLSCOUT_REGISTRY`: Path to the registry document.
pub fn registry_path() -> Option<PathBuf> {
    std::env::var(names::TOOLSCOUT_REGISTRY)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// `TOOLSCOUT_ENABLE_EXEC`: Opt-in gate for `execute_mcp_code`.
///
/// Accepts `1`, `true`, `yes`, `on` (case-insensitive). Anything else,
/// including an unset variable, leaves execution disabled.
pub fn exec_enabled() -> bool {
    std::env::var(names::TOOLSCOUT_ENABLE_EXEC)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

/// `TOOLSCOUT_CALL_TIMEOUT_MS`: Default per-call RPC timeout.
pub fn call_timeout_ms() -> Option<u64> {
    var_u64(names::TOOLSCOUT_CALL_TIMEOUT_MS)
}

/// `TOOLSCOUT_DESCRIBE_TIMEOUT_MS`: Timeout for `tools/list` during introspection.
pub fn describe_timeout_ms() -> Option<u64> {
    var_u64(names::TOOLSCOUT_DESCRIBE_TIMEOUT_MS)
}

/// `TOOLSCOUT_EXEC_TIMEOUT_MS`: Default overall timeout for code execution.
pub fn exec_timeout_ms() -> Option<u64> {
    var_u64(names::TOOLSCOUT_EXEC_TIMEOUT_MS)
}

/// `TOOLSCOUT_LOG`: Log filter directive (tracing `EnvFilter` syntax).
pub fn log_filter() -> Option<String> {
    std::env::var(names::TOOLSCOUT_LOG).ok()
}

/// `HOME`: User's home directory.
pub fn home() -> Option<PathBuf> {
    std::env::var(names::HOME).ok().map(PathBuf::from)
}

/// Read an arbitrary variable, used for `bearerTokenEnv` in registry entries.
pub fn var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

pub(crate) fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn var_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
