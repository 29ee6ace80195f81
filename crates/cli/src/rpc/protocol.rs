// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 envelopes and MCP message types.
//!
//! This module defines the wire format spoken to capability providers.
//! The client side only ever sends requests and notifications; everything
//! coming back is classified by [`Incoming::classify`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol version we advertise.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Versions a provider may answer with that we know how to talk to.
pub const KNOWN_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

// ============================================================================
// JSON-RPC Message Types
// ============================================================================

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: u64,
    /// Method name to invoke.
    pub method: &'a str,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification<'a> {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: &'static str,
    /// Method name.
    pub method: &'a str,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> JsonRpcNotification<'a> {
    pub fn new(method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Additional error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A message received from a provider, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Reply to one of our requests.
    Response {
        id: u64,
        outcome: Result<Value, JsonRpcError>,
    },
    /// Provider-initiated notification.
    Notification { method: String },
    /// Provider-initiated request. We never serve these.
    Request { id: Value, method: String },
    /// Structurally valid JSON that is not a JSON-RPC message we understand.
    Invalid(String),
}

impl Incoming {
    /// Classify a parsed JSON value.
    ///
    /// Response ids are accepted as numbers or numeric strings since some
    /// providers echo ids back as strings.
    pub fn classify(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Incoming::Invalid("message is not a JSON object".into());
        };

        if let Some(method) = map.get("method").and_then(Value::as_str).map(str::to_string) {
            return match map.remove("id") {
                Some(id) if !id.is_null() => Incoming::Request { id, method },
                _ => Incoming::Notification { method },
            };
        }

        let id = match map.get("id") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        let Some(id) = id else {
            return Incoming::Invalid("response without a usable id".into());
        };

        if let Some(error) = map.remove("error") {
            return match serde_json::from_value::<JsonRpcError>(error) {
                Ok(error) => Incoming::Response {
                    id,
                    outcome: Err(error),
                },
                Err(e) => Incoming::Invalid(format!("malformed error object: {}", e)),
            };
        }

        match map.remove("result") {
            Some(result) => Incoming::Response {
                id,
                outcome: Ok(result),
            },
            // A bare `{id}` reply is treated as a null result.
            None => Incoming::Response {
                id,
                outcome: Ok(Value::Null),
            },
        }
    }
}

// =============================================================================
// Initialization Types
// =============================================================================

/// Client information sent during initialization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "toolscout".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Initialize request parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    /// We don't advertise any optional capabilities.
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: Value::Object(Default::default()),
            client_info: ClientInfo::default(),
        }
    }
}

/// Server information from initialize response.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Initialize response result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

// =============================================================================
// Tool Types
// =============================================================================

/// Tool descriptor returned by `tools/list`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique tool name within the provider.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,

    /// JSON Schema for tool input.
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object"})
}

/// Response from the `tools/list` method.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsListResult {
    pub tools: Vec<ToolDescriptor>,
    /// Present when more pages are available.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Parameters for the `tools/call` method.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallParams<'a> {
    pub name: &'a str,
    pub arguments: Value,
}

/// Content block in a tool result.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Plain text content.
    Text { text: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// Result of a `tools/call`, as produced by our own agent-facing server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: None,
            is_error: false,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: None,
            is_error: true,
        }
    }

    /// Attach a machine-readable copy of the payload.
    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured_content = Some(value);
        self
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
