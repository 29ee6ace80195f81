// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;
use crate::orchestrator::{DescribeArgs, ExecuteArgs, ListArgs};

/// Progressive-disclosure gateway for MCP servers
#[derive(Parser, Debug)]
#[command(name = "toolscout", version, about)]
pub struct Cli {
    /// Registry document (defaults to ~/.toolscout/registry.json)
    #[arg(long, global = true, env = "TOOLSCOUT_REGISTRY", value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Allow execute_mcp_code (same as TOOLSCOUT_ENABLE_EXEC=1)
    #[arg(long, global = true)]
    pub enable_exec: bool,

    /// Per-call RPC timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub call_timeout_ms: Option<u64>,

    /// Timeout for tools/list during describe, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub describe_timeout_ms: Option<u64>,

    /// Default script deadline for execute_mcp_code, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub exec_timeout_ms: Option<u64>,

    /// Log at debug level (TOOLSCOUT_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the three gateway tools as an MCP server on stdin/stdout
    Serve,
    /// Search registered servers (list_mcp_capabilities)
    List(ListCommand),
    /// Show the tools of one server (describe_mcp)
    Describe(DescribeCommand),
    /// Run a script against allowed servers (execute_mcp_code)
    Exec(ExecCommand),
}

#[derive(Args, Debug)]
pub struct ListCommand {
    /// Free-text intent
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Only servers carrying one of these tags
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Only servers in one of these domains
    #[arg(long = "domain", value_name = "DOMAIN")]
    pub domains: Vec<String>,

    /// default, hidden or all
    #[arg(long)]
    pub visibility: Option<String>,

    #[arg(long)]
    pub limit: Option<i64>,

    /// minimal or summary
    #[arg(long)]
    pub detail: Option<String>,
}

#[derive(Args, Debug)]
pub struct DescribeCommand {
    /// Registry id of the server
    pub id: String,

    /// summary or schema
    #[arg(long)]
    pub detail: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExecCommand {
    /// Script file, or `-` for stdin
    #[arg(value_name = "FILE", conflicts_with = "code", required_unless_present = "code")]
    pub file: Option<PathBuf>,

    /// Inline script source
    #[arg(long, short = 'e')]
    pub code: Option<String>,

    /// Server id the script may call (repeatable)
    #[arg(long = "allow", value_name = "ID")]
    pub allow: Vec<String>,

    /// Overall deadline in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

impl Cli {
    /// Settings overrides carried by global flags.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            registry_path: self.registry.clone(),
            enable_exec: self.enable_exec,
            call_timeout_ms: self.call_timeout_ms,
            describe_timeout_ms: self.describe_timeout_ms,
            exec_timeout_ms: self.exec_timeout_ms,
        }
    }
}

impl From<ListCommand> for ListArgs {
    fn from(cmd: ListCommand) -> Self {
        ListArgs {
            query: cmd.query,
            tags: cmd.tags,
            domains: cmd.domains,
            visibility_filter: cmd.visibility,
            limit: cmd.limit,
            detail: cmd.detail,
        }
    }
}

impl From<DescribeCommand> for DescribeArgs {
    fn from(cmd: DescribeCommand) -> Self {
        DescribeArgs {
            id: cmd.id,
            detail: cmd.detail,
        }
    }
}

impl ExecCommand {
    /// Resolve the script source and build the tool arguments.
    pub fn into_args(self) -> std::io::Result<ExecuteArgs> {
        let source = match (self.code, self.file) {
            (Some(code), _) => code,
            (None, Some(path)) if path.as_os_str() == "-" => {
                std::io::read_to_string(std::io::stdin())?
            }
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => String::new(),
        };
        Ok(ExecuteArgs {
            source,
            allowed_mcp_ids: self.allow,
            timeout_ms: self.timeout_ms,
        })
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
