// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Full document generation run.
//!
//! A run resolves the global header and footer, then every generatable
//! descriptor, then the settings document. Everything is rendered into a
//! [`Generation`] first. Nothing reaches the export directory until the
//! whole run has succeeded, so a failing document never leaves a half
//! written export behind.

use crate::{
    document::{
        ComposeError, Composer, Output, SettingsAggregator, SettingsError, FOOTER_DESCRIPTOR,
        HEADER_DESCRIPTOR, SETTINGS_TEMPLATE,
    },
    layer::{
        document_template, is_reserved, resolve_descriptor, resolve_global, LayerError,
        LayerStack, ResolveError,
    },
    output::{OutputError, OutputSink},
    render::Renderer,
};

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument, warn};

/// Options of a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    /// Target platform name, e.g., `android`.
    pub platform: String,

    /// Whether documents pull in the native bridge script.
    pub native_bridge: bool,

    /// Package name prefix stripped from plugin identifiers.
    pub package_prefix: String,

    /// External settings values keyed by plugin identifier.
    pub settings: BTreeMap<String, String>,

    /// Installation configuration handed to the settings document.
    pub install: Value,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            platform: "android".into(),
            native_bridge: false,
            package_prefix: String::new(),
            settings: BTreeMap::new(),
            install: Value::Object(Map::new()),
        }
    }
}

/// Rendered outputs of a successful run, in generation order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Generation {
    outputs: Vec<Output>,
}

impl Generation {
    /// Rendered outputs in generation order.
    pub fn outputs(&self) -> &[Output] {
        self.outputs.as_slice()
    }

    /// Find rendered output by path.
    pub fn get(&self, path: &str) -> Option<&Output> {
        self.outputs.iter().find(|output| output.path == path)
    }

    /// Write every output to sink.
    ///
    /// # Errors
    ///
    /// - Return [`GenerateError::Output`] if any output cannot be written.
    pub fn commit(&self, sink: &mut impl OutputSink) -> Result<()> {
        for output in &self.outputs {
            sink.write(&output.path, &output.content)?;
        }
        info!("committed {} outputs", self.outputs.len());

        Ok(())
    }
}

/// List generatable descriptor names.
///
/// Covers every core and project descriptor, plus descriptors that some
/// plugin ships together with their document template. Reserved names are
/// excluded. Names come out sorted and de-duplicated.
///
/// # Errors
///
/// - Return [`GenerateError::Layer`] if any layer cannot list descriptors.
pub fn generatable_names(layers: &LayerStack) -> Result<Vec<String>> {
    let mut names = BTreeSet::new();
    names.extend(layers.core().descriptors()?);
    names.extend(layers.project().descriptors()?);

    for plugin in layers.plugins() {
        for name in plugin.descriptors()? {
            if plugin.has_template(&document_template(&name)) {
                names.insert(name);
            }
        }
    }

    Ok(names.into_iter().filter(|name| !is_reserved(name)).collect())
}

/// Run full generation over layer stack.
///
/// # Errors
///
/// - Return [`GenerateError::Layer`] if layers cannot be listed.
/// - Return [`GenerateError::Resolve`] if a descriptor cannot be resolved.
/// - Return [`GenerateError::Compose`] if a document cannot be composed.
/// - Return [`GenerateError::Settings`] if the settings document cannot be
///   built.
#[instrument(skip(layers, renderer, options), fields(platform = %options.platform), level = "debug")]
pub fn generate(
    layers: &LayerStack,
    renderer: &impl Renderer,
    options: &GenerateOptions,
) -> Result<Generation> {
    // INVARIANT: Project data overrides plugin data for the frame as well.
    let header = resolve_global(HEADER_DESCRIPTOR, layers)?;
    let footer = resolve_global(FOOTER_DESCRIPTOR, layers)?;
    let composer = Composer::new(
        layers,
        renderer,
        &options.platform,
        options.native_bridge,
    );

    let mut generation = Generation::default();
    for name in generatable_names(layers)? {
        let Some(resolved) = resolve_descriptor(&name, layers)? else {
            warn!("descriptor {name:?} has no owner, skipping");
            continue;
        };

        let auxiliary = composer.auxiliary(&resolved)?;
        if composer.is_document(&resolved) {
            let content = composer.compose(&resolved, &header, &footer)?;
            generation
                .outputs
                .push(Output::new(document_template(&name), content));
        } else {
            info!("descriptor {name:?} only contributes data");
        }
        generation.outputs.extend(auxiliary);
    }

    let aggregator = SettingsAggregator::new(
        layers,
        renderer,
        &options.platform,
        &options.package_prefix,
    );
    let settings = aggregator.build_settings_document(
        &options.settings,
        &options.install,
        &header,
        &footer,
    )?;
    if let Some(content) = settings {
        generation
            .outputs
            .push(Output::new(SETTINGS_TEMPLATE, content));
    }

    Ok(generation)
}

/// Generation error types.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Layer contents cannot be listed.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// Descriptor cannot be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Document cannot be composed.
    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// Settings document cannot be built.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Output cannot be written.
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Friendly result alias :3
pub type Result<T, E = GenerateError> = std::result::Result<T, E>;
