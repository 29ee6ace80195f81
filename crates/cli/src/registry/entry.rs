// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Registry entry types.
//!
//! One [`RegistryEntry`] describes a capability provider: how to reach it
//! (its [`TransportDescriptor`]) and the metadata used to find it by intent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::RegistryError;
use crate::env;

/// A known capability provider.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Unique, stable identifier used by `describe_mcp` and `$call`.
    pub id: String,

    /// Short human-readable name.
    pub title: String,

    /// One or two sentences on what the provider offers.
    #[serde(default)]
    pub summary: String,

    /// How to reach the provider.
    pub transport: TransportDescriptor,

    /// Problem domains (e.g. "calendar", "filesystem").
    #[serde(default)]
    pub domains: Vec<String>,

    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Example intents, in registry order.
    #[serde(default)]
    pub examples: Vec<String>,

    #[serde(default)]
    pub sensitivity: Sensitivity,

    #[serde(default)]
    pub visibility: Visibility,

    /// Higher sorts first among equally relevant entries.
    #[serde(default)]
    pub priority: i64,

    /// Fetch the tool list in the background when the server starts.
    #[serde(default)]
    pub auto_discover_tools: bool,
}

/// Connection details, tagged by `kind`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportDescriptor {
    /// Child process speaking line-delimited JSON-RPC on stdin/stdout.
    Stdio(StdioDescriptor),
    /// Stateless JSON-RPC over HTTP POST.
    Http(HttpDescriptor),
}

impl TransportDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportDescriptor::Stdio(_) => "stdio",
            TransportDescriptor::Http(_) => "http",
        }
    }
}

/// Child-process transport settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StdioDescriptor {
    /// Command to execute.
    pub command: String,

    /// Command arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for the child.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Optional working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

/// HTTP transport settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpDescriptor {
    /// Endpoint receiving JSON-RPC POSTs.
    pub url: String,

    /// Literal `Authorization` header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,

    /// Name of an environment variable holding a bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token_env: Option<String>,
}

impl HttpDescriptor {
    /// Resolve the `Authorization` header to attach, if any.
    ///
    /// A literal `authorization` wins over `bearerTokenEnv`. An unset or
    /// empty token variable yields no header.
    pub fn authorization_header(&self) -> Option<String> {
        if let Some(value) = &self.authorization {
            return Some(value.clone());
        }
        let name = self.bearer_token_env.as_deref()?;
        env::var(name)
            .filter(|token| !token.trim().is_empty())
            .map(|token| format!("Bearer {}", token.trim()))
    }
}

/// How careful an agent should be with a provider's side effects.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    #[default]
    Low,
    Medium,
    High,
}

/// Whether an entry shows up in unfiltered listings.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Default,
    Hidden,
}

impl RegistryEntry {
    /// Check structural invariants and drop duplicate tags/domains.
    pub(crate) fn validate(mut self) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidEntry {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.id.chars().any(char::is_whitespace) {
            return Err(invalid("id must not contain whitespace"));
        }
        if self.title.trim().is_empty() {
            return Err(invalid("title must not be empty"));
        }

        match &self.transport {
            TransportDescriptor::Stdio(stdio) => {
                if stdio.command.trim().is_empty() {
                    return Err(invalid("stdio transport requires a command"));
                }
            }
            TransportDescriptor::Http(http) => {
                let url = reqwest::Url::parse(&http.url)
                    .map_err(|e| invalid(&format!("invalid http url '{}': {}", http.url, e)))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(invalid("http transport url must use http or https"));
                }
            }
        }

        dedup_preserving_order(&mut self.domains);
        dedup_preserving_order(&mut self.tags);
        Ok(self)
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility == Visibility::Hidden
    }
}

fn dedup_preserving_order(values: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    values.retain(|v| seen.insert(v.to_lowercase()));
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
