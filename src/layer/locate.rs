// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Template lookup across plugin layers.
//!
//! Plugins may ship partial templates, e.g., a settings partial or a popup.
//! A template name must resolve to at most one plugin. Two plugins shipping
//! the same popup is an ambiguity that only a human can settle, so it is
//! never resolved by picking one of them.

use crate::layer::{Layer, LayerStack};

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::PathBuf,
};
use tracing::{debug, instrument};

/// Outcome of searching plugin layers for a template.
pub enum TemplateMatch<'a> {
    /// No plugin provides the template.
    None,

    /// Exactly one plugin provides the template.
    One(&'a dyn Layer),

    /// More than one plugin provides the template.
    Ambiguous(Vec<&'a dyn Layer>),
}

impl<'a> TemplateMatch<'a> {
    /// Reduce match to at most one providing layer.
    ///
    /// # Errors
    ///
    /// - Return [`LocateError::Ambiguous`] naming every matching layer path
    ///   if more than one plugin provides the template.
    pub fn unique(self, name: &str) -> Result<Option<&'a dyn Layer>> {
        match self {
            Self::None => Ok(None),
            Self::One(layer) => Ok(Some(layer)),
            Self::Ambiguous(layers) => Err(LocateError::Ambiguous {
                name: name.to_string(),
                locations: layers
                    .iter()
                    .map(|layer| layer.location().to_path_buf())
                    .collect(),
            }),
        }
    }

    /// All layers that provide the template.
    pub fn layers(&self) -> Vec<&'a dyn Layer> {
        match self {
            Self::None => Vec::new(),
            Self::One(layer) => vec![*layer],
            Self::Ambiguous(layers) => layers.clone(),
        }
    }
}

/// Searches plugin layers for named templates.
#[derive(Clone, Copy)]
pub struct TemplateLocator<'a> {
    layers: &'a LayerStack,
}

impl<'a> TemplateLocator<'a> {
    /// Construct new template locator over layer stack.
    pub fn new(layers: &'a LayerStack) -> Self {
        Self { layers }
    }

    /// Find template by name in plugin layers.
    ///
    /// Matches are reported in plugin enumeration order.
    #[instrument(skip(self), level = "debug")]
    pub fn find(&self, name: &str) -> TemplateMatch<'a> {
        let mut found = self
            .layers
            .plugins()
            .iter()
            .filter(|plugin| plugin.has_template(name))
            .map(|plugin| plugin.as_ref() as &dyn Layer)
            .collect::<Vec<_>>();
        debug!("template {name:?} found in {} plugins", found.len());

        match found.len() {
            0 => TemplateMatch::None,
            1 => TemplateMatch::One(found.remove(0)),
            _ => TemplateMatch::Ambiguous(found),
        }
    }

    /// Find template by name with fallback layer.
    ///
    /// Uses the plugin that provides the template if there is exactly one.
    /// Uses `fallback` if no plugin provides it, and the fallback itself
    /// does.
    ///
    /// # Errors
    ///
    /// - Return [`LocateError::Ambiguous`] if more than one plugin provides
    ///   the template.
    /// - Return [`LocateError::Missing`] if neither plugins nor fallback
    ///   provide the template.
    pub fn find_or(&self, name: &str, fallback: &'a dyn Layer) -> Result<&'a dyn Layer> {
        if let Some(layer) = self.find(name).unique(name)? {
            return Ok(layer);
        }

        if fallback.has_template(name) {
            return Ok(fallback);
        }

        Err(LocateError::Missing {
            name: name.to_string(),
            searched: fallback.location().to_path_buf(),
        })
    }
}

impl Debug for TemplateMatch<'_> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::None => fmt.write_str("None"),
            Self::One(layer) => fmt.debug_tuple("One").field(&layer.location()).finish(),
            Self::Ambiguous(layers) => fmt
                .debug_tuple("Ambiguous")
                .field(&layers.iter().map(|layer| layer.location()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// Template lookup error types.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    /// Template is provided by more than one plugin.
    #[error("template {name:?} exists more than once, this needs to be fixed: {locations:?}")]
    Ambiguous {
        name: String,
        locations: Vec<PathBuf>,
    },

    /// Template cannot be found anywhere.
    #[error("template {name:?} not found in any plugin or in {:?}", searched.display())]
    Missing { name: String, searched: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = LocateError> = std::result::Result<T, E>;
