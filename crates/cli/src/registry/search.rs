// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `list_mcp_capabilities`: filter and rank registry entries by intent.
//!
//! Ranking is plain case-insensitive substring relevance. Each whitespace
//! separated query term adds a weight per field it occurs in:
//!
//! | field    | weight |
//! |----------|--------|
//! | id       | 6 (10 when the term is the whole id) |
//! | title    | 5 |
//! | tags     | 4 |
//! | domains  | 3 |
//! | summary  | 2 |
//! | examples | 1 |
//!
//! Ties fall back to descending `priority`, then registry order.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::entry::{RegistryEntry, Sensitivity};
use super::Registry;
use crate::error::McpError;

/// Output shape of each listed server.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Detail {
    /// id and title only.
    Minimal,
    /// Adds summary, domains, tags, example count and availability.
    #[default]
    Summary,
}

impl FromStr for Detail {
    type Err = McpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(Detail::Minimal),
            "summary" => Ok(Detail::Summary),
            other => Err(McpError::InvalidArgument(format!(
                "detail must be \"minimal\" or \"summary\", got \"{}\"",
                other
            ))),
        }
    }
}

/// Which entries are eligible by visibility.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityFilter {
    /// Visible entries, plus a hidden entry whose id is the exact query.
    #[default]
    Default,
    /// Hidden entries only.
    Hidden,
    /// Everything.
    All,
}

impl FromStr for VisibilityFilter {
    type Err = McpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(VisibilityFilter::Default),
            "hidden" => Ok(VisibilityFilter::Hidden),
            "all" => Ok(VisibilityFilter::All),
            other => Err(McpError::InvalidArgument(format!(
                "visibilityFilter must be \"default\", \"hidden\" or \"all\", got \"{}\"",
                other
            ))),
        }
    }
}

/// Inputs to `list_mcp_capabilities`.
#[derive(Clone, Debug, Default)]
pub struct CapabilityQuery {
    pub query: Option<String>,
    pub tags: Vec<String>,
    pub domains: Vec<String>,
    pub visibility: VisibilityFilter,
    /// Must be at least 1 when given. Signed so that bad agent input can be
    /// reported rather than wrapped.
    pub limit: Option<i64>,
    pub detail: Detail,
}

/// One listed server.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<&'static str>,
    /// Last connection failure, when the provider is transiently unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

/// Result of `list_mcp_capabilities`.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct CapabilityList {
    pub servers: Vec<CapabilitySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Filter, rank and truncate registry entries.
///
/// `unavailable` reports the last connection failure for an id, if any.
/// Never fails for zero matches; only a `limit` below 1 is rejected.
pub fn list_capabilities<F>(
    registry: &Registry,
    query: &CapabilityQuery,
    unavailable: F,
) -> Result<CapabilityList, McpError>
where
    F: Fn(&str) -> Option<String>,
{
    let limit = match query.limit {
        Some(limit) if limit < 1 => {
            return Err(McpError::InvalidArgument(format!(
                "limit must be at least 1, got {}",
                limit
            )))
        }
        Some(limit) => Some(usize::try_from(limit).unwrap_or(usize::MAX)),
        None => None,
    };

    if registry.is_empty() {
        return Ok(CapabilityList {
            servers: Vec::new(),
            message: Some(format!(
                "No MCP servers are registered. Add entries to {} and restart to make them discoverable.",
                registry.path().display()
            )),
        });
    }

    let terms = query_terms(query.query.as_deref());
    let exact_id = query
        .query
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut ranked: Vec<(u32, &RegistryEntry)> = registry
        .entries()
        .iter()
        .filter(|entry| visible(entry, query.visibility, exact_id.as_deref()))
        .filter(|entry| intersects(&entry.tags, &query.tags))
        .filter(|entry| intersects(&entry.domains, &query.domains))
        .map(|entry| (score(entry, &terms), entry))
        .filter(|(score, _)| terms.is_empty() || *score > 0)
        .collect();

    // Stable sort keeps registry order for equal score and priority.
    ranked.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| b.priority.cmp(&a.priority)));

    let servers: Vec<CapabilitySummary> = ranked
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(_, entry)| summarize(entry, query.detail, unavailable(&entry.id)))
        .collect();

    let message = servers.is_empty().then(|| {
        "No MCP servers matched. Try a broader query or drop the tag/domain filters.".to_string()
    });

    Ok(CapabilityList { servers, message })
}

fn query_terms(query: Option<&str>) -> Vec<String> {
    query
        .map(|q| q.split_whitespace().map(str::to_lowercase).collect())
        .unwrap_or_default()
}

fn visible(entry: &RegistryEntry, filter: VisibilityFilter, exact_id: Option<&str>) -> bool {
    match filter {
        VisibilityFilter::All => true,
        VisibilityFilter::Hidden => entry.is_hidden(),
        VisibilityFilter::Default => {
            !entry.is_hidden() || exact_id.is_some_and(|id| entry.id.to_lowercase() == id)
        }
    }
}

/// Empty filter matches everything; otherwise any shared value (case-insensitive).
fn intersects(values: &[String], filter: &[String]) -> bool {
    filter.is_empty()
        || filter
            .iter()
            .any(|wanted| values.iter().any(|v| v.eq_ignore_ascii_case(wanted)))
}

fn score(entry: &RegistryEntry, terms: &[String]) -> u32 {
    let id = entry.id.to_lowercase();
    let title = entry.title.to_lowercase();
    let summary = entry.summary.to_lowercase();
    let contains_any = |values: &[String], term: &str| {
        values.iter().any(|v| v.to_lowercase().contains(term))
    };

    terms
        .iter()
        .map(|term| {
            let mut points = 0;
            if id == *term {
                points += 10;
            } else if id.contains(term.as_str()) {
                points += 6;
            }
            if title.contains(term.as_str()) {
                points += 5;
            }
            if contains_any(&entry.tags, term) {
                points += 4;
            }
            if contains_any(&entry.domains, term) {
                points += 3;
            }
            if summary.contains(term.as_str()) {
                points += 2;
            }
            if contains_any(&entry.examples, term) {
                points += 1;
            }
            points
        })
        .sum()
}

fn summarize(
    entry: &RegistryEntry,
    detail: Detail,
    unavailable: Option<String>,
) -> CapabilitySummary {
    let mut summary = CapabilitySummary {
        id: entry.id.clone(),
        title: entry.title.clone(),
        summary: None,
        domains: None,
        tags: None,
        example_count: None,
        sensitivity: None,
        transport: None,
        unavailable: None,
    };
    if detail == Detail::Summary {
        summary.summary = Some(entry.summary.clone());
        summary.domains = Some(entry.domains.clone());
        summary.tags = Some(entry.tags.clone());
        summary.example_count = Some(entry.examples.len());
        summary.sensitivity = Some(entry.sensitivity);
        summary.transport = Some(entry.transport.kind());
        summary.unavailable = unavailable;
    }
    summary
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
