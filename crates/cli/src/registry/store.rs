// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Registry document loading.
//!
//! The registry is read once from a fixed path at startup and is immutable
//! afterwards. Picking up edits requires a restart.
//!
//! Accepted shapes:
//! - a JSON array of entries
//! - an object wrapper `{"servers": [...]}`
//! - either of the above written as JSON5 (comments, trailing commas)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::entry::RegistryEntry;
use super::RegistryError;

/// Immutable, validated set of registry entries in document order.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    path: PathBuf,
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Load and validate the registry document at `path`.
    ///
    /// A missing file yields an empty registry so callers can point the
    /// agent at the path to populate; any other read failure is an error.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "registry file not found, starting empty");
                return Ok(Self::empty(path));
            }
            Err(e) => {
                return Err(RegistryError::Io {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        Self::parse(path, &content)
    }

    /// Parse registry content that notionally lives at `path`.
    pub fn parse(path: &Path, content: &str) -> Result<Self, RegistryError> {
        let parse_error = |reason: String| RegistryError::Parse {
            path: path.display().to_string(),
            reason,
        };

        if content.trim().is_empty() {
            return Ok(Self::empty(path));
        }

        let document = parse_document(content).map_err(parse_error)?;
        let items = match document {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("servers") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(parse_error(
                        "expected an array of entries or an object with a \"servers\" array".into(),
                    ))
                }
            },
            _ => return Err(parse_error("expected an array of entries".into())),
        };

        let mut entries = Vec::with_capacity(items.len());
        for (position, item) in items.into_iter().enumerate() {
            let label = item
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", position));
            let entry: RegistryEntry =
                serde_json::from_value(item).map_err(|e| RegistryError::InvalidEntry {
                    id: label,
                    reason: e.to_string(),
                })?;
            entries.push(entry);
        }

        Self::from_entries(path, entries)
    }

    /// Build a registry from already-deserialized entries.
    pub fn from_entries(
        path: impl Into<PathBuf>,
        entries: Vec<RegistryEntry>,
    ) -> Result<Self, RegistryError> {
        let mut validated = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());

        for entry in entries {
            let entry = entry.validate()?;
            if index.contains_key(&entry.id) {
                return Err(RegistryError::DuplicateId(entry.id));
            }
            index.insert(entry.id.clone(), validated.len());
            validated.push(entry);
        }

        Ok(Self {
            path: path.into(),
            entries: validated,
            index,
        })
    }

    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }

    /// Where the registry was (or would have been) read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries in document order, hidden ones included.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.index.get(id).and_then(|&i| self.entries.get(i))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strict JSON first, then JSON5.
///
/// When both fail, the JSON5 message is reported for syntax problems (it
/// understands comments) and the JSON message otherwise.
fn parse_document(content: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => Ok(value),
        Err(json_err) => match json5::from_str::<Value>(content) {
            Ok(value) => Ok(value),
            Err(json5_err) => {
                if json_err.classify() == serde_json::error::Category::Syntax {
                    Err(json5_err.to_string())
                } else {
                    Err(json_err.to_string())
                }
            }
        },
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
