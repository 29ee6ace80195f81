// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-provider RPC client pool.
//!
//! Clients are created lazily from registry entries on first use and then
//! shared by introspection and execution. A client that has closed (its
//! process died, a stdio call timed out, or it was shut down) is replaced on
//! the next request for it, never reused.
//!
//! The pool also remembers the last reason each provider could not be
//! reached so that capability listings can flag it as unavailable.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::McpError;
use crate::registry::{Registry, RegistryEntry};
use crate::rpc::{ClientOptions, RpcClient};

/// Produces initialized clients for registry entries.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, entry: &RegistryEntry) -> Result<RpcClient, McpError>;
}

/// Opens the entry's real transport and performs the MCP handshake.
#[derive(Clone, Debug, Default)]
pub struct TransportConnector {
    options: ClientOptions,
}

impl TransportConnector {
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for TransportConnector {
    async fn connect(&self, entry: &RegistryEntry) -> Result<RpcClient, McpError> {
        let client = RpcClient::connect(entry, self.options.clone()).await?;
        client.initialize().await?;
        Ok(client)
    }
}

/// One provider's pooled client. Its lock serializes connecting to that
/// provider only.
type Slot = Arc<Mutex<Option<Arc<RpcClient>>>>;

pub struct SessionPool {
    registry: Arc<Registry>,
    connector: Box<dyn Connector>,
    slots: parking_lot::Mutex<HashMap<String, Slot>>,
    unavailable: parking_lot::Mutex<HashMap<String, String>>,
}

impl SessionPool {
    pub fn new(registry: Arc<Registry>, options: ClientOptions) -> Self {
        Self::with_connector(registry, Box::new(TransportConnector::new(options)))
    }

    pub fn with_connector(registry: Arc<Registry>, connector: Box<dyn Connector>) -> Self {
        Self {
            registry,
            connector,
            slots: parking_lot::Mutex::new(HashMap::new()),
            unavailable: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the live client for `id`, connecting if needed.
    pub async fn client(&self, id: &str) -> Result<Arc<RpcClient>, McpError> {
        let entry = self
            .registry
            .get(id)
            .ok_or_else(|| McpError::NotFound(id.to_string()))?;

        let slot = Arc::clone(self.slots.lock().entry(id.to_string()).or_default());
        let mut current = slot.lock().await;
        if let Some(client) = current.as_ref() {
            if !client.is_closed() {
                return Ok(Arc::clone(client));
            }
            tracing::debug!(provider = id, "replacing closed client");
            *current = None;
        }

        match self.connector.connect(entry).await {
            Ok(client) => {
                let client = Arc::new(client);
                *current = Some(Arc::clone(&client));
                self.unavailable.lock().remove(id);
                Ok(client)
            }
            Err(e) => {
                self.note_failure(id, &e);
                Err(e)
            }
        }
    }

    /// Record `error` as the provider's unavailability reason if it means
    /// the provider could not be reached.
    pub fn note_failure(&self, id: &str, error: &McpError) {
        if error.is_unavailability() {
            tracing::warn!(provider = id, error = %error, "MCP server unavailable");
            self.unavailable
                .lock()
                .insert(id.to_string(), error.to_string());
        }
    }

    /// Last connection failure for `id`, if it has not since recovered.
    pub fn unavailable_reason(&self, id: &str) -> Option<String> {
        self.unavailable.lock().get(id).cloned()
    }

    fn slot(&self, id: &str) -> Option<Slot> {
        self.slots.lock().get(id).cloned()
    }

    /// Whether a live client is currently pooled for `id`. A provider that
    /// is still connecting is not.
    pub async fn is_connected(&self, id: &str) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        let connected = match slot.try_lock() {
            Ok(current) => current.as_ref().is_some_and(|client| !client.is_closed()),
            Err(_) => false,
        };
        connected
    }

    /// Drop and close the pooled client for `id`, if any.
    pub async fn discard(&self, id: &str) {
        let Some(slot) = self.slot(id) else {
            return;
        };
        let client = slot.lock().await.take();
        if let Some(client) = client {
            client.close().await;
        }
    }

    /// Close every pooled client.
    pub async fn shutdown(&self) {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();
        let mut clients = Vec::with_capacity(slots.len());
        for slot in slots {
            clients.extend(slot.lock().await.take());
        }
        tracing::debug!(count = clients.len(), "closing MCP clients");
        futures::future::join_all(clients.iter().map(|client| client.close())).await;
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
