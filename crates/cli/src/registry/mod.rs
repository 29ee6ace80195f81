// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Capability registry.
//!
//! The registry is a static catalog mapping provider ids to connection info
//! and search metadata. It is loaded once ([`store`]), validated
//! ([`entry`]) and searched by intent ([`search`]).

pub mod entry;
pub mod search;
pub mod store;

pub use entry::{
    HttpDescriptor, RegistryEntry, Sensitivity, StdioDescriptor, TransportDescriptor, Visibility,
};
pub use search::{
    list_capabilities, CapabilityList, CapabilityQuery, CapabilitySummary, Detail,
    VisibilityFilter,
};
pub use store::Registry;

/// Errors that can occur when loading the registry document.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read registry from {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("failed to parse registry {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid registry entry '{id}': {reason}")]
    InvalidEntry { id: String, reason: String },

    #[error("duplicate registry id '{0}'")]
    DuplicateId(String),
}
