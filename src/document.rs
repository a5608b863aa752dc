// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document composition.
//!
//! A __document__ is one rendered output file, e.g., a page of the
//! application. Every document is wrapped in the same __frame__: the core
//! layer's `header.html` and `footer.html`, rendered with merged header and
//! footer data. What goes between them depends on the document:
//!
//! - Ordinary documents are composed from their merged descriptor by the
//!   [`Composer`]. See [`compose`] for the section rules.
//! - The settings document is aggregated from plugin settings partials by
//!   the [`SettingsAggregator`]. See [`settings`].

pub mod compose;
pub mod settings;

pub use compose::{ComposeError, Composer, DocumentContext};
pub use settings::{normalize_plugin_id, SettingsAggregator, SettingsError};

use crate::{
    layer::LayerStack,
    render::{Renderer, Result as RenderResult},
};

use serde_json::{json, Value};
use tracing::debug;

/// Descriptor holding global header data.
pub const HEADER_DESCRIPTOR: &str = "header";

/// Descriptor holding global footer data.
pub const FOOTER_DESCRIPTOR: &str = "footer";

/// Template rendering the shared document header.
pub const HEADER_TEMPLATE: &str = "header.html";

/// Template rendering the shared document footer.
pub const FOOTER_TEMPLATE: &str = "footer.html";

/// Template of the settings document and of settings partials.
pub const SETTINGS_TEMPLATE: &str = "settings.html";

/// Directory that auxiliary templates are written to.
pub const AUXILIARY_DIR: &str = "templates";

/// Rendered output ready to be written relative to the export directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Path relative to export directory.
    pub path: String,

    /// Rendered text.
    pub content: String,
}

impl Output {
    /// Construct new output.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Rendered header and footer of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Rendered header text.
    pub header: String,

    /// Rendered footer text.
    pub footer: String,
}

/// Render document frame from core header and footer templates.
///
/// A core layer without a header or footer template yields empty text for
/// that part of the frame.
///
/// # Errors
///
/// - Return [`RenderError`](crate::render::RenderError) if either template
///   fails to render.
pub fn render_frame(
    layers: &LayerStack,
    renderer: &impl Renderer,
    header: &Value,
    footer: &Value,
    platform: &str,
) -> RenderResult<Frame> {
    let core = layers.core();
    let mut frame = Frame::default();

    if core.has_template(HEADER_TEMPLATE) {
        let context = json!({"data": header, "platform": platform});
        frame.header = renderer.render(core, HEADER_TEMPLATE, &context)?;
    } else {
        debug!("core provides no {HEADER_TEMPLATE}");
    }

    if core.has_template(FOOTER_TEMPLATE) {
        let context = json!({"data": footer, "platform": platform});
        frame.footer = renderer.render(core, FOOTER_TEMPLATE, &context)?;
    } else {
        debug!("core provides no {FOOTER_TEMPLATE}");
    }

    Ok(frame)
}
