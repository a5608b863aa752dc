// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Template rendering.
//!
//! Expanding placeholders is not this crate's business. Given a template
//! name, the layer that provides it, and a data context, a [`Renderer`]
//! produces text. The hard part, selecting the right template and the right
//! merged data, happens before a renderer is ever called.
//!
//! [`JinjaRenderer`] is the stock implementation. Each layer gets one
//! [`Environment`] whose loader serves that layer's templates by name, so
//! templates can include or extend their siblings. A template is only
//! compiled once something asks for it.
//!
//! # Undefined Values
//!
//! Looking up a missing field renders as empty text, and looping over one
//! yields nothing. Suppressed sections hand templates an empty mapping, so
//! `{% for link in data.links %}` must not be an error.

use crate::layer::{Layer, LayerError};

use minijinja::{
    value::{Kwargs, Value as JinjaValue},
    AutoEscape, Environment, Error as JinjaError, ErrorKind, UndefinedBehavior,
};
use serde_json::Value;
use std::{
    cell::RefCell,
    collections::{hash_map::Entry, HashMap},
    io,
    path::PathBuf,
};
use tracing::{debug, instrument};

/// Capability to render a layer's template with a data context.
pub trait Renderer {
    /// Render template provided by layer with data context.
    ///
    /// The context must be a mapping; its keys become template variables.
    ///
    /// # Errors
    ///
    /// - Return [`RenderError`] if template cannot be loaded or rendered.
    fn render(&self, layer: &dyn Layer, template: &str, context: &Value) -> Result<String>;
}

/// Renderer backed by MiniJinja.
///
/// Autoescaping is disabled, because rendered fragments are spliced into
/// other templates verbatim.
#[derive(Debug, Default)]
pub struct JinjaRenderer {
    environments: RefCell<HashMap<PathBuf, Environment<'static>>>,
}

impl JinjaRenderer {
    /// Construct new renderer with empty template cache.
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip(layer), fields(layer = %layer.location().display()), level = "debug")]
    fn environment(layer: &dyn Layer) -> Result<Environment<'static>> {
        let mut sources = HashMap::new();
        for name in layer.templates()? {
            match layer.read_template(&name) {
                Ok(Some(source)) => {
                    sources.insert(name, source);
                }
                Ok(None) => {}
                // INVARIANT: Files that are not text can never be templates.
                Err(LayerError::Read { source, path })
                    if source.kind() == io::ErrorKind::InvalidData =>
                {
                    debug!("skip non-text file {:?}", path.display());
                }
                Err(error) => return Err(error.into()),
            }
        }
        debug!("serve {} templates", sources.len());

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_unknown_method_callback(minijinja_contrib::pycompat::unknown_method_callback);
        env.add_function("get_letter", get_letter);
        env.set_loader(move |name| Ok(sources.get(name).cloned()));

        Ok(env)
    }
}

impl Renderer for JinjaRenderer {
    fn render(&self, layer: &dyn Layer, template: &str, context: &Value) -> Result<String> {
        if !context.is_object() {
            return Err(RenderError::Context {
                template: template.to_string(),
            });
        }

        let mut environments = self.environments.borrow_mut();
        let env = match environments.entry(layer.location().to_path_buf()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Self::environment(layer)?),
        };

        env.get_template(template)
            .and_then(|compiled| compiled.render(context))
            .map_err(|source| RenderError::Render {
                source,
                template: template.to_string(),
                location: layer.location().to_path_buf(),
            })
    }
}

/// Column letter of a jQuery Mobile grid holding `count` blocks.
///
/// A grid of two blocks is grid "a", three is "b", and so on. Zero or one
/// block also yields "a". Returns `None` past the end of the alphabet's
/// code point range.
pub fn grid_letter(count: usize) -> Option<char> {
    if count <= 1 {
        return Some('a');
    }

    u32::try_from(count - 2)
        .ok()
        .and_then(|offset| offset.checked_add(u32::from('a')))
        .and_then(char::from_u32)
}

// Template function: `get_letter(items=...)`.
fn get_letter(kwargs: Kwargs) -> std::result::Result<String, JinjaError> {
    let items: Option<JinjaValue> = kwargs.get("items")?;
    kwargs.assert_all_used()?;

    let items = items.ok_or_else(|| {
        JinjaError::new(ErrorKind::MissingArgument, "get_letter expects `items` argument")
    })?;
    let count = if items.is_undefined() || items.is_none() {
        0
    } else {
        items.len().ok_or_else(|| {
            JinjaError::new(
                ErrorKind::InvalidOperation,
                format!("get_letter expects a list or mapping, got {:?}", items.kind()),
            )
        })?
    };

    grid_letter(count).map(String::from).ok_or_else(|| {
        JinjaError::new(
            ErrorKind::InvalidOperation,
            format!("no grid letter for {count} items"),
        )
    })
}

/// Template rendering error types.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Layer templates cannot be listed or read.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// Data context is not a mapping.
    #[error("data context of template {template:?} is not a mapping")]
    Context { template: String },

    /// Template cannot be loaded or rendered.
    #[error("failed to render template {template:?} from {:?}", location.display())]
    Render {
        #[source]
        source: JinjaError,
        template: String,
        location: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = RenderError> = std::result::Result<T, E>;
