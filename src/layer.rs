// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layered data and template sources.
//!
//! Documents are generated from three ordered kinds of __layer__:
//!
//! - __Core__: the defaults. Always present. Core decides which documents
//!   exist, but has the lowest override priority.
//! - __Project__: theme specific overrides. May define wholly new documents.
//! - __Plugin__: zero or more independent override sources. Plugins may only
//!   enrich documents that core defines, unless they ship a document of
//!   their own.
//!
//! # Layer Layout
//!
//! A layer is a tree of files. Every `<name>.json` file is a __descriptor__:
//! structured data describing one document. Every other file is a
//! __template__. A descriptor whose layer also holds `<name>.html` is
//! document-generating. Descriptors without a template only contribute
//! override data to other layers.
//!
//! Names are paths relative to the layer root using `/` as separator, so
//! `pages/map.json` holds the descriptor named `pages/map`.

pub mod dir;
pub mod locate;
pub mod memory;
pub mod resolve;

pub use dir::DirLayer;
pub use locate::{LocateError, TemplateLocator, TemplateMatch};
pub use memory::MemoryLayer;
pub use resolve::{resolve_descriptor, resolve_global, ResolveError, Resolved};

use serde_json::Value;
use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

/// File extension of descriptor files.
pub const DESCRIPTOR_EXT: &str = "json";

/// File extension of document templates.
pub const TEMPLATE_EXT: &str = "html";

/// Descriptor names that are structural inputs rather than documents.
pub const RESERVED_NAMES: [&str; 3] = ["header", "footer", "settings"];

/// Template name of a document's main template.
pub fn document_template(name: &str) -> String {
    format!("{name}.{TEMPLATE_EXT}")
}

/// Check if descriptor name is reserved.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// The kind of a layer, ordered by override priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerKind {
    /// Defaults shipped with the application.
    Core,

    /// Theme specific overrides.
    Project,

    /// Plugin provided overrides.
    Plugin,
}

impl Display for LayerKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Core => fmt.write_str("core"),
            Self::Project => fmt.write_str("project"),
            Self::Plugin => fmt.write_str("plugin"),
        }
    }
}

/// Read-only source of descriptors and templates.
///
/// Implementations must be deterministic: listing the same layer twice
/// yields the same names in the same (sorted) order.
pub trait Layer: Debug {
    /// Identifier of layer, e.g., "core", "project", or plugin identifier.
    fn id(&self) -> &str;

    /// Kind of layer.
    fn kind(&self) -> LayerKind;

    /// Root location of layer, used for diagnostics.
    fn location(&self) -> &Path;

    /// List names of all descriptors in sorted order.
    ///
    /// # Errors
    ///
    /// - Return [`LayerError::Scan`] if layer cannot be enumerated.
    fn descriptors(&self) -> Result<Vec<String>>;

    /// Read and parse descriptor by name.
    ///
    /// Returns `None` if the layer does not provide the descriptor.
    ///
    /// # Errors
    ///
    /// - Return [`LayerError::Read`] if descriptor cannot be read.
    /// - Return [`LayerError::Parse`] if descriptor is malformed.
    fn read_descriptor(&self, name: &str) -> Result<Option<Value>>;

    /// List names of all templates in sorted order.
    ///
    /// # Errors
    ///
    /// - Return [`LayerError::Scan`] if layer cannot be enumerated.
    fn templates(&self) -> Result<Vec<String>>;

    /// Read template source by name.
    ///
    /// Returns `None` if the layer does not provide the template.
    ///
    /// # Errors
    ///
    /// - Return [`LayerError::Read`] if template cannot be read.
    fn read_template(&self, name: &str) -> Result<Option<String>>;

    /// Check if layer provides template.
    fn has_template(&self, name: &str) -> bool;

    /// Check if layer provides descriptor.
    fn has_descriptor(&self, name: &str) -> bool;
}

/// The ordered set of layers for one generation run.
#[derive(Debug)]
pub struct LayerStack {
    core: Box<dyn Layer>,
    project: Box<dyn Layer>,
    plugins: Vec<Box<dyn Layer>>,
}

impl LayerStack {
    /// Construct new layer stack.
    ///
    /// Plugins are applied in the order given.
    pub fn new(
        core: impl Layer + 'static,
        project: impl Layer + 'static,
        plugins: impl IntoIterator<Item = Box<dyn Layer>>,
    ) -> Self {
        Self {
            core: Box::new(core),
            project: Box::new(project),
            plugins: plugins.into_iter().collect(),
        }
    }

    /// Open layer stack from directory roots.
    ///
    /// Plugins are given as identifier and root pairs, in enumeration order.
    ///
    /// # Errors
    ///
    /// - Return [`LayerError::Scan`] if any layer tree cannot be walked.
    pub fn open(
        core: impl Into<PathBuf>,
        project: impl Into<PathBuf>,
        plugins: impl IntoIterator<Item = (String, PathBuf)>,
    ) -> Result<Self> {
        let core = DirLayer::open(LayerKind::Core, "core", core)?;
        let project = DirLayer::open(LayerKind::Project, "project", project)?;
        let plugins = plugins
            .into_iter()
            .map(|(id, root)| {
                DirLayer::open(LayerKind::Plugin, id, root)
                    .map(|layer| Box::new(layer) as Box<dyn Layer>)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(core, project, plugins))
    }

    /// Core layer.
    pub fn core(&self) -> &dyn Layer {
        self.core.as_ref()
    }

    /// Project layer.
    pub fn project(&self) -> &dyn Layer {
        self.project.as_ref()
    }

    /// Plugin layers in enumeration order.
    pub fn plugins(&self) -> &[Box<dyn Layer>] {
        &self.plugins
    }

    /// Find layer by kind and identifier.
    pub fn get(&self, kind: LayerKind, id: &str) -> Option<&dyn Layer> {
        match kind {
            LayerKind::Core => Some(self.core()),
            LayerKind::Project => Some(self.project()),
            LayerKind::Plugin => self
                .plugins
                .iter()
                .find(|layer| layer.id() == id)
                .map(|layer| layer.as_ref() as &dyn Layer),
        }
    }
}

/// Layer access error types.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    /// Layer tree cannot be enumerated.
    #[error("failed to scan layer at {:?}", root.display())]
    Scan {
        #[source]
        source: ignore::Error,
        root: PathBuf,
    },

    /// Layer file cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Descriptor is not valid structured data.
    #[error("malformed descriptor {:?}", path.display())]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = LayerError> = std::result::Result<T, E>;
