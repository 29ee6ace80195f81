// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transports carrying JSON-RPC frames to a provider.
//!
//! A transport only moves bytes. Inbound traffic is pushed to the
//! [`EventSink`] handed over at construction, and correlation is left to
//! [`RpcClient`](super::client::RpcClient). Two implementations exist:
//!
//! - [`StdioTransport`]: a child process speaking newline-delimited JSON.
//! - [`HttpTransport`]: one stateless POST per frame.

mod http;
mod stdio;

pub use http::HttpTransport;
pub use stdio::{LineBuffer, StdioTransport};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::McpError;
use crate::registry::{RegistryEntry, TransportDescriptor};

/// Something a transport observed.
#[derive(Debug)]
pub enum TransportEvent {
    /// A parsed inbound JSON message.
    Message(Value),
    /// A request frame failed without a JSON-RPC reply (HTTP only).
    Failed { id: u64, error: TransportError },
    /// A complete inbound line that is not JSON. The session survives.
    Malformed { line: String, error: String },
    /// The session is gone (EOF, process exit, explicit close).
    Closed { reason: String },
}

/// Where transports deliver inbound events.
pub type EventSink = mpsc::UnboundedSender<TransportEvent>;

/// One outbound JSON-RPC message.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Request id, `None` for notifications.
    pub id: Option<u64>,
    /// Serialized JSON body without trailing newline.
    pub body: Vec<u8>,
}

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to spawn the child process.
    #[error("failed to spawn process: {0}")]
    Spawn(String),

    /// Process stdin not available (already taken or closed).
    #[error("stdin not available")]
    StdinNotAvailable,

    /// Process stdout not available (already taken or closed).
    #[error("stdout not available")]
    StdoutNotAvailable,

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP endpoint could not be reached.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The HTTP endpoint answered with a non-success status.
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Inbound payload could not be parsed.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Transport is already shut down.
    #[error("transport is shut down")]
    Shutdown,
}

impl TransportError {
    /// Lift into the public taxonomy: parse failures are protocol errors,
    /// everything else means the provider is unreachable.
    pub fn into_mcp(self, provider: &str) -> McpError {
        match self {
            TransportError::Parse(reason) => McpError::protocol(provider, reason),
            TransportError::Shutdown => McpError::Closed(provider.to_string()),
            other => McpError::connection(provider, other),
        }
    }
}

/// A bidirectional message channel to one provider.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport kind, as named in the registry.
    fn kind(&self) -> &'static str;

    /// Write one frame.
    async fn send(&self, frame: Frame) -> Result<(), TransportError>;

    /// Give up on an in-flight request.
    ///
    /// Stdio cannot cancel a single request and kills the session instead;
    /// HTTP aborts only that POST. Must not block.
    fn abandon(&self, id: u64);

    /// Tear the session down. Idempotent.
    async fn close(&self);
}

/// Open the transport described by a registry entry.
pub async fn connect(
    entry: &RegistryEntry,
    sink: EventSink,
) -> Result<Box<dyn Transport>, TransportError> {
    match &entry.transport {
        TransportDescriptor::Stdio(stdio) => {
            let transport = StdioTransport::spawn(&entry.id, stdio, sink).await?;
            Ok(Box::new(transport))
        }
        TransportDescriptor::Http(http) => {
            let transport = HttpTransport::new(&entry.id, http, sink)?;
            Ok(Box::new(transport))
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
