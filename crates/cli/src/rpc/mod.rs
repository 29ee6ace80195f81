// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC plumbing towards MCP providers.
//!
//! - [`protocol`]: wire envelopes and MCP message types
//! - [`transport`]: stdio and HTTP byte carriers behind one trait
//! - [`client`]: request correlation, timeouts, lifecycle
//! - [`abort`]: cancellation signals observed by calls

pub mod abort;
pub mod client;
pub mod protocol;
pub mod transport;

pub use abort::{abort_pair, AbortHandle, AbortSignal};
pub use client::{CallOptions, ClientOptions, ClientState, RpcClient};
pub use protocol::{ServerInfo, ToolDescriptor};
pub use transport::{Transport, TransportError, TransportEvent};
