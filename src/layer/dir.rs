// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layers backed by a directory tree.

use crate::layer::{Layer, LayerError, LayerKind, Result, DESCRIPTOR_EXT};

use ignore::WalkBuilder;
use serde_json::Value;
use std::{
    collections::BTreeSet,
    fs::read_to_string,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Layer whose descriptors and templates live in a directory tree.
///
/// The tree is scanned once when the layer is opened. Hidden files and
/// directories are skipped. Ignore files are __not__ honored, because
/// layer trees often live inside repositories that ignore generated content.
#[derive(Debug, Clone)]
pub struct DirLayer {
    id: String,
    kind: LayerKind,
    root: PathBuf,
    descriptors: BTreeSet<String>,
    templates: BTreeSet<String>,
}

impl DirLayer {
    /// Open layer at target root directory.
    ///
    /// A missing root directory is not an error. It simply yields a layer
    /// that contributes nothing.
    ///
    /// # Errors
    ///
    /// - Return [`LayerError::Scan`] if directory tree cannot be walked.
    #[instrument(skip(id, root), level = "debug")]
    pub fn open(kind: LayerKind, id: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self> {
        let mut layer = Self {
            id: id.into(),
            kind,
            root: root.into(),
            descriptors: BTreeSet::new(),
            templates: BTreeSet::new(),
        };

        if !layer.root.is_dir() {
            warn!("{kind} layer {:?} does not exist", layer.root.display());
            return Ok(layer);
        }

        let walker = WalkBuilder::new(&layer.root)
            .standard_filters(false)
            .hidden(true)
            .build();
        for entry in walker {
            let entry = entry.map_err(|source| LayerError::Scan {
                source,
                root: layer.root.clone(),
            })?;

            if !entry.file_type().is_some_and(|kind| kind.is_file()) {
                continue;
            }

            let Some(name) = entry
                .path()
                .strip_prefix(&layer.root)
                .ok()
                .and_then(relative_name)
            else {
                continue;
            };

            let descriptor_suffix = format!(".{DESCRIPTOR_EXT}");
            match name.strip_suffix(descriptor_suffix.as_str()) {
                Some(stem) => layer.descriptors.insert(stem.to_string()),
                None => layer.templates.insert(name),
            };
        }

        debug!(
            "{} layer {:?}: {} descriptors, {} templates",
            layer.kind,
            layer.id,
            layer.descriptors.len(),
            layer.templates.len()
        );

        Ok(layer)
    }

    fn descriptor_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{DESCRIPTOR_EXT}"))
    }

    fn read_file(&self, path: PathBuf) -> Result<String> {
        read_to_string(&path).map_err(|source| LayerError::Read { source, path })
    }
}

impl Layer for DirLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> LayerKind {
        self.kind
    }

    fn location(&self) -> &Path {
        &self.root
    }

    fn descriptors(&self) -> Result<Vec<String>> {
        Ok(self.descriptors.iter().cloned().collect())
    }

    fn read_descriptor(&self, name: &str) -> Result<Option<Value>> {
        if !self.descriptors.contains(name) {
            return Ok(None);
        }

        let path = self.descriptor_path(name);
        let content = self.read_file(path.clone())?;
        let value = serde_json::from_str(&content)
            .map_err(|source| LayerError::Parse { source, path })?;

        Ok(Some(value))
    }

    fn templates(&self) -> Result<Vec<String>> {
        Ok(self.templates.iter().cloned().collect())
    }

    fn read_template(&self, name: &str) -> Result<Option<String>> {
        if !self.templates.contains(name) {
            return Ok(None);
        }

        self.read_file(self.root.join(name)).map(Some)
    }

    fn has_template(&self, name: &str) -> bool {
        self.templates.contains(name)
    }

    fn has_descriptor(&self, name: &str) -> bool {
        self.descriptors.contains(name)
    }
}

// INVARIANT: Names always use '/' no matter the platform separator.
fn relative_name(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }

    (!parts.is_empty()).then(|| parts.join("/"))
}
