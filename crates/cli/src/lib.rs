// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! toolscout: a progressive-disclosure gateway for MCP servers.
//!
//! Agents see three tools instead of every tool of every server:
//!
//! - `list_mcp_capabilities` searches a local registry of servers by intent
//! - `describe_mcp` connects to one server and lists its tools (cached)
//! - `execute_mcp_code` runs a small script that calls tools on an explicit
//!   allow-list of servers, behind an environment opt-in
//!
#![doc = include_str!("../README.md")]

pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod exec;
pub mod introspect;
pub mod orchestrator;
pub mod registry;
pub mod rpc;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
