// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `execute_mcp_code`: run agent-written scripts against allow-listed
//! providers.
//!
//! Scripts are a small JavaScript-flavoured language evaluated in-process by
//! [`interp::Interpreter`]. The interpreter reaches providers only through
//! the `$call` builtin, which is bound to the request's allow-list.
//!
//! This is not a security boundary. Scripts share the gateway's process and
//! memory; only run input you would run yourself.

pub mod interp;
pub mod lexer;
pub mod parser;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::env;
use crate::error::McpError;
use crate::rpc::{CallOptions, RpcClient};
use crate::session::SessionPool;

pub use interp::{CallBridge, Interpreter, Outcome, STDOUT_LIMIT, TRUNCATION_MARKER};
pub use parser::parse;

/// Default overall deadline for one script.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30);

/// Syntax or runtime error in a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("script error at line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// One `execute_mcp_code` invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    pub source: String,
    /// Providers the script may reach. Empty means none.
    pub allowed: BTreeSet<String>,
    /// Overrides the engine default.
    pub timeout: Option<Duration>,
}

/// Result of `execute_mcp_code`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutput {
    pub stdout: String,
    pub result: Value,
}

pub struct ExecutionEngine {
    pool: Arc<SessionPool>,
    enabled: bool,
    default_timeout: Duration,
    call_timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(
        pool: Arc<SessionPool>,
        enabled: bool,
        default_timeout: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            enabled,
            default_timeout,
            call_timeout,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run a script.
    ///
    /// Checks, in order: the opt-in gate, that every allowed id exists, and
    /// that the source parses. Only then are clients connected and the
    /// script run, all under one deadline. When the deadline passes the
    /// running script is dropped, which cancels its in-flight calls.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutput, McpError> {
        if !self.enabled {
            return Err(McpError::ExecutionDisabled {
                flag: env::TOOLSCOUT_ENABLE_EXEC,
            });
        }
        if let Some(unknown) = request
            .allowed
            .iter()
            .find(|id| !self.pool.registry().contains(id))
        {
            return Err(McpError::NotFound(unknown.clone()));
        }
        let program = parser::parse(&request.source)?;

        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let started = Instant::now();
        tracing::info!(
            allowed = ?request.allowed,
            timeout_ms = timeout.as_millis() as u64,
            "executing script"
        );

        let run = async {
            let bridge = self.bridge(&request.allowed).await?;
            Interpreter::new(&bridge).run(&program).await
        };
        let outcome = match tokio::time::timeout(timeout, run).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "script timed out");
                return Err(McpError::ExecutionTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout_bytes = outcome.stdout.len(),
            "script finished"
        );
        Ok(ExecutionOutput {
            stdout: outcome.stdout,
            result: outcome.result,
        })
    }

    /// Ensure a client for every allowed id.
    async fn bridge(&self, allowed: &BTreeSet<String>) -> Result<ScopedBridge, McpError> {
        let mut clients = HashMap::new();
        for id in allowed {
            let client = self.pool.client(id).await?;
            clients.insert(id.clone(), client);
        }
        Ok(ScopedBridge {
            pool: Arc::clone(&self.pool),
            clients,
            call_timeout: self.call_timeout,
        })
    }
}

/// `$call` bound to one request's allow-list.
struct ScopedBridge {
    pool: Arc<SessionPool>,
    clients: HashMap<String, Arc<RpcClient>>,
    call_timeout: Duration,
}

#[async_trait]
impl CallBridge for ScopedBridge {
    async fn call(&self, provider: &str, tool: &str, arguments: Value) -> Result<Value, McpError> {
        let Some(client) = self.clients.get(provider) else {
            return Err(McpError::NotAllowed(provider.to_string()));
        };
        // A stdio session may have died since the script started.
        let client = if client.is_closed() {
            self.pool.client(provider).await?
        } else {
            Arc::clone(client)
        };
        client
            .call_tool(tool, arguments, CallOptions::with_timeout(self.call_timeout))
            .await
            .inspect_err(|e| self.pool.note_failure(provider, e))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
