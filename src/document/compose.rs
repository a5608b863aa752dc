// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document composition from merged descriptors.
//!
//! A merged descriptor may declare the following sections:
//!
//! - `header`: merged onto the global header data. Descriptor wins.
//! - `footer`: merged onto a copy of the global footer data, unless it is
//!   explicitly empty, in which case the document has an empty footer.
//! - `body`: blocks of the document, always ordered by key.
//! - `popups`: named popups, each with a `template` and a `data` payload,
//!   rendered in declaration order.
//! - `templates`: auxiliary templates rendered next to the document, e.g.,
//!   satellite scripts.
//!
//! # Home Layer
//!
//! Templates that a document refers to without going through plugins come
//! from its __home layer__: the layer that owns the document. Core documents
//! render from core even when the project ships a template of the same
//! name. Project documents render from the project, and plugin documents from
//! the owning plugin.

use crate::{
    document::{render_frame, Output, AUXILIARY_DIR},
    layer::{
        document_template, Layer, LayerKind, LayerStack, LocateError, Resolved, TemplateLocator,
    },
    merge::{is_empty_section, merged},
    render::{RenderError, Renderer},
};

use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::{info, instrument};

/// Composes documents from merged descriptors.
#[derive(Debug)]
pub struct Composer<'a, R>
where
    R: Renderer,
{
    layers: &'a LayerStack,
    renderer: &'a R,
    platform: &'a str,
    native_bridge: bool,
}

/// Fully resolved data of one document, ready for final rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentContext {
    /// Header data after merging descriptor header onto global header.
    pub header: Value,

    /// Footer data after applying explicit suppression rule.
    pub footer: Value,

    /// Body blocks ordered by key.
    pub body: Value,

    /// Rendered popup fragments in declaration order.
    pub popups: Vec<String>,
}

impl<'a, R> Composer<'a, R>
where
    R: Renderer,
{
    /// Construct new composer.
    ///
    /// The native bridge flag decides whether documents should pull in the
    /// native bridge script, e.g., `cordova.js`.
    pub fn new(
        layers: &'a LayerStack,
        renderer: &'a R,
        platform: &'a str,
        native_bridge: bool,
    ) -> Self {
        Self {
            layers,
            renderer,
            platform,
            native_bridge,
        }
    }

    /// Find the home layer of a document if it provides a template.
    ///
    /// Returns `None` if the home layer does not provide it.
    pub fn home_layer(&self, resolved: &Resolved, template: &str) -> Option<&'a dyn Layer> {
        self.home(resolved)
            .filter(|layer| layer.has_template(template))
    }

    fn home(&self, resolved: &Resolved) -> Option<&'a dyn Layer> {
        match resolved.origin {
            LayerKind::Core => Some(self.layers.core()),
            LayerKind::Project => Some(self.layers.project()),
            LayerKind::Plugin => self.layers.get(LayerKind::Plugin, &resolved.owner),
        }
    }

    /// Check if resolved descriptor generates a document.
    ///
    /// Descriptors without a document template in their home layer only
    /// contribute data.
    pub fn is_document(&self, resolved: &Resolved) -> bool {
        self.home_layer(resolved, &document_template(&resolved.name))
            .is_some()
    }

    /// Render auxiliary templates declared under `templates` section.
    ///
    /// Auxiliary templates are rendered without any data context, and are
    /// placed under the auxiliary template directory by name.
    ///
    /// # Errors
    ///
    /// - Return [`ComposeError::Malformed`] if `templates` section is not a
    ///   mapping of template names.
    /// - Return [`ComposeError::MissingAuxiliary`] if home layer does not
    ///   provide a declared template.
    /// - Return [`ComposeError::Render`] if a template fails to render.
    #[instrument(skip(self, resolved), fields(document = %resolved.name), level = "debug")]
    pub fn auxiliary(&self, resolved: &Resolved) -> Result<Vec<Output>> {
        let Some(section) = resolved.data.get("templates") else {
            return Ok(Vec::new());
        };
        let entries = section
            .as_object()
            .ok_or_else(|| malformed(resolved, "templates", "expected a mapping"))?;

        let mut outputs = Vec::new();
        for (key, entry) in entries {
            let template = entry.as_str().ok_or_else(|| {
                malformed(resolved, "templates", &format!("entry {key:?} is not a template name"))
            })?;
            let layer = self.home_layer(resolved, template).ok_or_else(|| {
                ComposeError::MissingAuxiliary {
                    document: resolved.name.clone(),
                    template: template.to_string(),
                }
            })?;

            info!("TEMPLATE: generating template {template}");
            let content = self
                .renderer
                .render(layer, template, &Value::Object(Map::new()))?;
            outputs.push(Output::new(format!("{AUXILIARY_DIR}/{template}"), content));
        }

        Ok(outputs)
    }

    /// Build document context from resolved descriptor and global data.
    ///
    /// # Errors
    ///
    /// - Return [`ComposeError::Malformed`] if `popups` section is malformed.
    /// - Return [`ComposeError::Locate`] if a popup template is ambiguous or
    ///   missing.
    /// - Return [`ComposeError::Render`] if a popup fails to render.
    #[instrument(skip(self, resolved, header, footer), fields(document = %resolved.name), level = "debug")]
    pub fn context(
        &self,
        resolved: &Resolved,
        header: &Value,
        footer: &Value,
    ) -> Result<DocumentContext> {
        let data = &resolved.data;

        let header = match data.get("header") {
            Some(own) => merged(header, own.clone()),
            None => header.clone(),
        };

        let footer = match data.get("footer") {
            Some(own) if is_empty_section(own) => own.clone(),
            Some(own) => merged(footer, own.clone()),
            None => footer.clone(),
        };

        let body = match data.get("body") {
            Some(Value::Object(body)) => Value::Object(sorted(body)),
            Some(other) => other.clone(),
            None => Value::Object(Map::new()),
        };

        let popups = self.popups(resolved)?;

        Ok(DocumentContext {
            header,
            footer,
            body,
            popups,
        })
    }

    /// Compose finished document text.
    ///
    /// # Errors
    ///
    /// - Return [`ComposeError::NotDocument`] if home layer provides no
    ///   document template.
    /// - Return any error of [`Composer::context`].
    /// - Return [`ComposeError::Render`] if frame or document fails to
    ///   render.
    #[instrument(skip(self, resolved, header, footer), fields(document = %resolved.name), level = "debug")]
    pub fn compose(&self, resolved: &Resolved, header: &Value, footer: &Value) -> Result<String> {
        let template = document_template(&resolved.name);
        let layer = self
            .home_layer(resolved, &template)
            .ok_or_else(|| ComposeError::NotDocument {
                document: resolved.name.clone(),
            })?;

        let context = self.context(resolved, header, footer)?;
        let frame = render_frame(
            self.layers,
            self.renderer,
            &context.header,
            &context.footer,
            self.platform,
        )?;

        let mut header_data = Map::new();
        header_data.insert("cordova".into(), Value::Bool(self.native_bridge));
        header_data.insert(
            "title".into(),
            header.get("title").cloned().unwrap_or(Value::Null),
        );

        let document = json!({
            "header_data": header_data,
            "body": context.body,
            "popups": context.popups.join("\n"),
            "platform": self.platform,
            "header": frame.header,
            "footer": frame.footer,
        });

        info!("generating file {template}");
        Ok(self.renderer.render(layer, &template, &document)?)
    }

    fn popups(&self, resolved: &Resolved) -> Result<Vec<String>> {
        let Some(section) = resolved.data.get("popups") else {
            return Ok(Vec::new());
        };
        let entries = section
            .as_object()
            .ok_or_else(|| malformed(resolved, "popups", "expected a mapping"))?;

        let locator = TemplateLocator::new(self.layers);
        let mut fragments = Vec::new();
        for (key, entry) in entries {
            let template = entry
                .get("template")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    malformed(resolved, "popups", &format!("popup {key:?} names no template"))
                })?;

            let layer = match locator.find(template).unique(template)? {
                Some(plugin) => {
                    info!("POPUP: adding {template} popup from plugins in {}", resolved.name);
                    plugin
                }
                None => {
                    let home = self.home_layer(resolved, template).ok_or_else(|| {
                        LocateError::Missing {
                            name: template.to_string(),
                            searched: self.fallback_location(resolved),
                        }
                    })?;
                    info!(
                        "POPUP: adding {template} popup from {} in {}",
                        home.kind(),
                        resolved.name
                    );
                    home
                }
            };

            let context = json!({"data": entry.get("data").cloned().unwrap_or(Value::Null)});
            fragments.push(self.renderer.render(layer, template, &context)?);
        }

        Ok(fragments)
    }

    fn fallback_location(&self, resolved: &Resolved) -> PathBuf {
        self.home(resolved)
            .map(|layer| layer.location().to_path_buf())
            .unwrap_or_default()
    }
}

fn sorted(map: &Map<String, Value>) -> Map<String, Value> {
    let mut entries = map.iter().collect::<Vec<_>>();
    entries.sort_by(|(left, _), (right, _)| left.cmp(right));
    entries
        .into_iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn malformed(resolved: &Resolved, section: &str, reason: &str) -> ComposeError {
    ComposeError::Malformed {
        document: resolved.name.clone(),
        section: section.to_string(),
        reason: reason.to_string(),
    }
}

/// Document composition error types.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Descriptor section has the wrong shape.
    #[error("malformed {section:?} section in document {document:?}: {reason}")]
    Malformed {
        document: String,
        section: String,
        reason: String,
    },

    /// Popup template is ambiguous or missing.
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// Auxiliary template is missing from home layer.
    #[error("auxiliary template {template:?} of document {document:?} not found")]
    MissingAuxiliary { document: String, template: String },

    /// Descriptor has no document template.
    #[error("descriptor {document:?} has no document template")]
    NotDocument { document: String },

    /// Template fails to render.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Friendly result alias :3
pub type Result<T, E = ComposeError> = std::result::Result<T, E>;
