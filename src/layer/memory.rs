// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layers held entirely in memory.

use crate::layer::{Layer, LayerError, LayerKind, Result};

use serde_json::Value;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Layer whose descriptors and templates are plain strings in memory.
///
/// Descriptors are stored as raw text and parsed on read, so a malformed
/// descriptor fails the same way a malformed file would.
#[derive(Debug, Clone)]
pub struct MemoryLayer {
    id: String,
    kind: LayerKind,
    location: PathBuf,
    descriptors: BTreeMap<String, String>,
    templates: BTreeMap<String, String>,
}

impl MemoryLayer {
    /// Construct new empty layer.
    pub fn new(kind: LayerKind, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            location: PathBuf::from(format!("memory/{id}")),
            id,
            kind,
            descriptors: BTreeMap::new(),
            templates: BTreeMap::new(),
        }
    }

    /// Override diagnostic location of layer.
    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = location.into();
        self
    }

    /// Add descriptor from raw text.
    pub fn with_descriptor(mut self, name: impl Into<String>, data: impl Into<String>) -> Self {
        self.descriptors.insert(name.into(), data.into());
        self
    }

    /// Add descriptor from structured value.
    pub fn with_value(self, name: impl Into<String>, data: &Value) -> Self {
        self.with_descriptor(name, data.to_string())
    }

    /// Add template.
    pub fn with_template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(name.into(), source.into());
        self
    }
}

impl Layer for MemoryLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> LayerKind {
        self.kind
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn descriptors(&self) -> Result<Vec<String>> {
        Ok(self.descriptors.keys().cloned().collect())
    }

    fn read_descriptor(&self, name: &str) -> Result<Option<Value>> {
        let Some(data) = self.descriptors.get(name) else {
            return Ok(None);
        };

        serde_json::from_str(data)
            .map(Some)
            .map_err(|source| LayerError::Parse {
                source,
                path: self.location.join(format!("{name}.json")),
            })
    }

    fn templates(&self) -> Result<Vec<String>> {
        Ok(self.templates.keys().cloned().collect())
    }

    fn read_template(&self, name: &str) -> Result<Option<String>> {
        Ok(self.templates.get(name).cloned())
    }

    fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    fn has_descriptor(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }
}
