// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `describe_mcp`: list one provider's tools.
//!
//! The raw `tools/list` result is cached per provider for the lifetime of
//! the [`Introspector`]. A provider restart does not invalidate the cache;
//! only [`Introspector::invalidate`] does.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::McpError;
use crate::rpc::{CallOptions, ToolDescriptor};
use crate::session::SessionPool;

/// Default bound on a `tools/list` round trip.
pub const DEFAULT_DESCRIBE_TIMEOUT: Duration = Duration::from_secs(15);

/// How much of each tool to return.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DescribeDetail {
    /// Name and description.
    #[default]
    Summary,
    /// Adds the full input schema.
    Schema,
}

impl FromStr for DescribeDetail {
    type Err = McpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "summary" => Ok(DescribeDetail::Summary),
            "schema" => Ok(DescribeDetail::Schema),
            other => Err(McpError::InvalidArgument(format!(
                "detail must be \"summary\" or \"schema\", got \"{}\"",
                other
            ))),
        }
    }
}

/// One tool as reported by `describe_mcp`.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// Result of `describe_mcp`.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProviderDescription {
    pub id: String,
    pub tools: Vec<ToolSummary>,
}

pub struct Introspector {
    pool: Arc<SessionPool>,
    timeout: Duration,
    cache: parking_lot::Mutex<HashMap<String, Arc<Vec<ToolDescriptor>>>>,
}

impl Introspector {
    pub fn new(pool: Arc<SessionPool>, timeout: Duration) -> Self {
        Self {
            pool,
            timeout,
            cache: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Describe provider `id` at the requested detail.
    pub async fn describe(
        &self,
        id: &str,
        detail: DescribeDetail,
    ) -> Result<ProviderDescription, McpError> {
        let tools = self.tools(id).await?;
        Ok(ProviderDescription {
            id: id.to_string(),
            tools: tools.iter().map(|tool| summarize(tool, detail)).collect(),
        })
    }

    /// The provider's tool list, fetched once and then served from cache.
    pub async fn tools(&self, id: &str) -> Result<Arc<Vec<ToolDescriptor>>, McpError> {
        if !self.pool.registry().contains(id) {
            return Err(McpError::NotFound(id.to_string()));
        }
        if let Some(tools) = self.cache.lock().get(id) {
            return Ok(Arc::clone(tools));
        }

        let client = self.pool.client(id).await?;
        let tools = client
            .list_tools(CallOptions::with_timeout(self.timeout))
            .await
            .inspect_err(|e| self.pool.note_failure(id, e))?;

        tracing::debug!(provider = id, count = tools.len(), "cached tool list");
        let tools = Arc::new(tools);
        self.cache
            .lock()
            .insert(id.to_string(), Arc::clone(&tools));
        Ok(tools)
    }

    /// Drop the cached tool list for `id`. Returns whether one was cached.
    pub fn invalidate(&self, id: &str) -> bool {
        self.cache.lock().remove(id).is_some()
    }

    pub fn is_cached(&self, id: &str) -> bool {
        self.cache.lock().contains_key(id)
    }
}

fn summarize(tool: &ToolDescriptor, detail: DescribeDetail) -> ToolSummary {
    ToolSummary {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: (detail == DescribeDetail::Schema).then(|| tool.input_schema.clone()),
    }
}

#[cfg(test)]
#[path = "introspect_tests.rs"]
mod tests;
