// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed error taxonomy surfaced at the agent-facing tool boundary.
//!
//! Every failure that reaches `list_mcp_capabilities`, `describe_mcp` or
//! `execute_mcp_code` is one of these variants, never a bare string. The
//! [`McpError::kind`] tag is what the stdio server reports alongside the
//! human-readable message so that agents can branch on it.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::exec::ScriptError;
use crate::registry::RegistryError;

/// Errors produced by the registry, RPC clients, introspection and execution.
#[derive(Debug, Error)]
pub enum McpError {
    /// Registry document is malformed. Fatal at startup.
    #[error("invalid registry: {0}")]
    Config(#[from] RegistryError),

    /// Bad tool-call inputs. Reported, never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown provider id.
    #[error("unknown MCP server '{0}'")]
    NotFound(String),

    /// Spawn failure or unreachable endpoint.
    #[error("cannot reach MCP server '{provider}': {reason}")]
    Connection { provider: String, reason: String },

    /// Malformed JSON-RPC traffic.
    #[error("protocol error from MCP server '{provider}': {reason}")]
    Protocol { provider: String, reason: String },

    /// No response before the deadline.
    #[error("request '{method}' to MCP server '{provider}' timed out after {timeout_ms}ms")]
    Timeout {
        provider: String,
        method: String,
        timeout_ms: u64,
    },

    /// The caller aborted the request before a response arrived.
    #[error("request '{method}' to MCP server '{provider}' was cancelled")]
    Cancelled { provider: String, method: String },

    /// The provider answered with a JSON-RPC error object.
    #[error("MCP server '{provider}' returned error {code} ({kind}): {message}")]
    RemoteTool {
        provider: String,
        code: i64,
        kind: RpcErrorKind,
        message: String,
        data: Option<Value>,
    },

    /// Call issued on a client that is closing or closed.
    #[error("client for MCP server '{0}' is closed; reconnect required")]
    Closed(String),

    /// `execute_mcp_code` was invoked without the environment opt-in.
    #[error("code execution is disabled; set {flag}=1 to enable execute_mcp_code")]
    ExecutionDisabled { flag: &'static str },

    /// The whole script ran past its deadline.
    #[error("code execution timed out after {timeout_ms}ms")]
    ExecutionTimeout { timeout_ms: u64 },

    /// Executed code called a provider outside its allow-list.
    #[error("MCP server '{0}' is not listed in allowedMcpIds")]
    NotAllowed(String),

    /// Syntax or runtime error in executed code.
    #[error(transparent)]
    Script(#[from] ScriptError),
}

impl McpError {
    /// Stable machine-readable tag for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::Config(_) => "config_error",
            McpError::InvalidArgument(_) => "invalid_argument",
            McpError::NotFound(_) => "not_found",
            McpError::Connection { .. } => "connection_error",
            McpError::Protocol { .. } => "protocol_error",
            McpError::Timeout { .. } | McpError::ExecutionTimeout { .. } => "timeout",
            McpError::Cancelled { .. } => "cancelled",
            McpError::RemoteTool { .. } => "remote_tool_error",
            McpError::Closed(_) => "closed",
            McpError::ExecutionDisabled { .. } => "execution_disabled",
            McpError::NotAllowed(_) => "not_allowed",
            McpError::Script(_) => "script_error",
        }
    }

    /// Whether this failure means the provider could not be reached at all.
    pub fn is_unavailability(&self) -> bool {
        matches!(self, McpError::Connection { .. } | McpError::Timeout { .. })
    }

    pub(crate) fn remote(provider: &str, code: i64, message: String, data: Option<Value>) -> Self {
        McpError::RemoteTool {
            provider: provider.to_string(),
            code,
            kind: RpcErrorKind::from_code(code),
            message,
            data,
        }
    }

    pub(crate) fn protocol(provider: &str, reason: impl fmt::Display) -> Self {
        McpError::Protocol {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn connection(provider: &str, reason: impl fmt::Display) -> Self {
        McpError::Connection {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Classification of a JSON-RPC 2.0 error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpcErrorKind {
    /// -32700
    ParseError,
    /// -32600
    InvalidRequest,
    /// -32601
    MethodNotFound,
    /// -32602
    InvalidParams,
    /// -32603
    InternalError,
    /// -32000 to -32099
    ServerError,
    /// Anything else, including application-defined codes.
    Other,
}

impl RpcErrorKind {
    /// Map a raw JSON-RPC error code to its class.
    pub fn from_code(code: i64) -> Self {
        match code {
            -32700 => RpcErrorKind::ParseError,
            -32600 => RpcErrorKind::InvalidRequest,
            -32601 => RpcErrorKind::MethodNotFound,
            -32602 => RpcErrorKind::InvalidParams,
            -32603 => RpcErrorKind::InternalError,
            -32099..=-32000 => RpcErrorKind::ServerError,
            _ => RpcErrorKind::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RpcErrorKind::ParseError => "parse error",
            RpcErrorKind::InvalidRequest => "invalid request",
            RpcErrorKind::MethodNotFound => "method not found",
            RpcErrorKind::InvalidParams => "invalid params",
            RpcErrorKind::InternalError => "internal error",
            RpcErrorKind::ServerError => "server error",
            RpcErrorKind::Other => "application error",
        }
    }
}

impl fmt::Display for RpcErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
