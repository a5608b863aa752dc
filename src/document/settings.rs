// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Settings document aggregation.
//!
//! Every plugin may ship a `settings.html` partial that renders its own block
//! of the settings screen. The project layer may ship one too. Each partial
//! is rendered with the externally configured value for that plugin, and the
//! resulting fragments are wrapped by core's `settings.html` together with
//! the usual document frame.
//!
//! # Plugin Identifiers
//!
//! External settings values are keyed by plugin identifier. Plugins fetched
//! as packages carry a fixed name prefix, e.g., `fieldtrip-gps`, that the
//! settings keys do not, e.g., `gps`. The prefix is stripped before lookup.

use crate::{
    document::{render_frame, SETTINGS_TEMPLATE},
    layer::{Layer, LayerStack, TemplateLocator},
    render::{RenderError, Renderer},
};

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Identifier used for the project layer's settings partial.
pub const PROJECT_SETTINGS_ID: &str = "project";

/// Aggregates plugin settings partials into the settings document.
#[derive(Debug)]
pub struct SettingsAggregator<'a, R>
where
    R: Renderer,
{
    layers: &'a LayerStack,
    renderer: &'a R,
    platform: &'a str,
    package_prefix: &'a str,
}

impl<'a, R> SettingsAggregator<'a, R>
where
    R: Renderer,
{
    /// Construct new settings aggregator.
    pub fn new(
        layers: &'a LayerStack,
        renderer: &'a R,
        platform: &'a str,
        package_prefix: &'a str,
    ) -> Self {
        Self {
            layers,
            renderer,
            platform,
            package_prefix,
        }
    }

    /// List layers providing a settings partial with their identifiers.
    ///
    /// Plugins come first in enumeration order, followed by the project
    /// layer if it provides a partial.
    pub fn partials(&self) -> Vec<(String, &'a dyn Layer)> {
        let mut partials = TemplateLocator::new(self.layers)
            .find(SETTINGS_TEMPLATE)
            .layers()
            .into_iter()
            .map(|layer| (layer.id().to_string(), layer))
            .collect::<Vec<_>>();

        let project = self.layers.project();
        if project.has_template(SETTINGS_TEMPLATE) {
            partials.push((PROJECT_SETTINGS_ID.to_string(), project));
        }

        partials
    }

    /// Render every settings partial with its external value.
    ///
    /// # Errors
    ///
    /// - Return [`SettingsError::Value`] if a structured external value is
    ///   malformed.
    /// - Return [`SettingsError::Render`] if a partial fails to render.
    #[instrument(skip(self, values), level = "debug")]
    pub fn fragments(&self, values: &BTreeMap<String, String>) -> Result<Vec<String>> {
        let mut fragments = Vec::new();
        for (id, layer) in self.partials() {
            let key = normalize_plugin_id(&id, self.package_prefix);
            let settings = match values.get(key) {
                Some(value) => settings_value(key, value)?,
                None => {
                    debug!("no settings value for {key:?}");
                    Value::Object(Map::new())
                }
            };

            info!("SETTINGS: adding settings of {id}");
            let context = json!({"settings": settings});
            fragments.push(self.renderer.render(layer, SETTINGS_TEMPLATE, &context)?);
        }

        Ok(fragments)
    }

    /// Build settings document.
    ///
    /// Returns `None` if core provides no settings template, because there
    /// is nothing to wrap the fragments in.
    ///
    /// # Errors
    ///
    /// - Return any error of [`SettingsAggregator::fragments`].
    /// - Return [`SettingsError::Render`] if frame or document fails to
    ///   render.
    pub fn build_settings_document(
        &self,
        values: &BTreeMap<String, String>,
        config: &Value,
        header: &Value,
        footer: &Value,
    ) -> Result<Option<String>> {
        let core = self.layers.core();
        if !core.has_template(SETTINGS_TEMPLATE) {
            warn!("core provides no {SETTINGS_TEMPLATE}, skipping settings document");
            return Ok(None);
        }

        let fragments = self.fragments(values)?;
        let frame = render_frame(self.layers, self.renderer, header, footer, self.platform)?;
        let context = json!({
            "settings": fragments.join("\n"),
            "config": config,
            "header": frame.header,
            "footer": frame.footer,
        });

        info!("generating file {SETTINGS_TEMPLATE}");
        Ok(Some(self.renderer.render(core, SETTINGS_TEMPLATE, &context)?))
    }
}

/// Strip package prefix from plugin identifier.
///
/// Identifiers without the prefix are returned unchanged.
pub fn normalize_plugin_id<'a>(id: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return id;
    }

    id.strip_prefix(prefix).unwrap_or(id)
}

// INVARIANT: Values that look like structured data must parse as such.
fn settings_value(key: &str, value: &str) -> Result<Value> {
    if !value.trim_start().starts_with('{') {
        return Ok(Value::String(value.to_string()));
    }

    serde_json::from_str(value).map_err(|source| SettingsError::Value {
        source,
        key: key.to_string(),
    })
}

/// Settings aggregation error types.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// External settings value looks structured but fails to parse.
    #[error("malformed settings value for {key:?}")]
    Value {
        #[source]
        source: serde_json::Error,
        key: String,
    },

    /// Partial or settings document fails to render.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Friendly result alias :3
pub type Result<T, E = SettingsError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layer::{LayerKind, MemoryLayer},
        render::JinjaRenderer,
    };
    use simple_test_case::test_case;

    fn stack(project: MemoryLayer, plugins: Vec<MemoryLayer>) -> LayerStack {
        let core = MemoryLayer::new(LayerKind::Core, "core")
            .with_template("header.html", "<h>{{ data.title }}</h>")
            .with_template("footer.html", "<f/>")
            .with_template(
                "settings.html",
                "{{ header }}{{ settings }}{{ config.name }}{{ footer }}",
            );

        LayerStack::new(
            core,
            project,
            plugins
                .into_iter()
                .map(|plugin| Box::new(plugin) as Box<dyn Layer>),
        )
    }

    fn partial(id: &str, body: &str) -> MemoryLayer {
        MemoryLayer::new(LayerKind::Plugin, id)
            .with_template("settings.html", format!("<{id}>{body}</{id}>"))
    }

    #[test_case("fieldtrip-gps", "fieldtrip-", "gps"; "package plugin")]
    #[test_case("gps", "fieldtrip-", "gps"; "repository plugin")]
    #[test_case("my-fieldtrip-gps", "fieldtrip-", "my-fieldtrip-gps"; "prefix not leading")]
    #[test_case("fieldtrip-gps", "", "fieldtrip-gps"; "no prefix")]
    #[test]
    fn plugin_id_normalization(id: &str, prefix: &str, expect: &str) {
        pretty_assertions::assert_eq!(normalize_plugin_id(id, prefix), expect);
    }

    #[test]
    fn fragments_follow_plugin_order_then_project() -> anyhow::Result<()> {
        let layers = stack(
            MemoryLayer::new(LayerKind::Project, "project")
                .with_template("settings.html", "<project>{{ settings }}</project>"),
            vec![
                partial("fieldtrip-gps", "{{ settings.interval }}"),
                partial("sync", "{{ settings }}"),
            ],
        );
        let renderer = JinjaRenderer::new();
        let aggregator = SettingsAggregator::new(&layers, &renderer, "android", "fieldtrip-");
        let values = BTreeMap::from([
            ("gps".to_string(), r#"{"interval": 5}"#.to_string()),
            ("sync".to_string(), "nightly".to_string()),
            ("project".to_string(), "theme".to_string()),
        ]);

        let result = aggregator.fragments(&values)?;
        let expect = vec![
            "<fieldtrip-gps>5</fieldtrip-gps>".to_string(),
            "<sync>nightly</sync>".to_string(),
            "<project>theme</project>".to_string(),
        ];
        pretty_assertions::assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn malformed_structured_value_is_fatal() {
        let layers = stack(
            MemoryLayer::new(LayerKind::Project, "project"),
            vec![partial("gps", "{{ settings | tojson }}")],
        );
        let renderer = JinjaRenderer::new();
        let aggregator = SettingsAggregator::new(&layers, &renderer, "android", "fieldtrip-");
        let values = BTreeMap::from([("gps".to_string(), "{oops".to_string())]);

        let result = aggregator.fragments(&values);
        assert!(matches!(result, Err(SettingsError::Value { key, .. }) if key == "gps"));
    }

    #[test]
    fn settings_document_wraps_fragments_in_frame() -> anyhow::Result<()> {
        let layers = stack(
            MemoryLayer::new(LayerKind::Project, "project"),
            vec![partial("gps", "{{ settings | tojson }}")],
        );
        let renderer = JinjaRenderer::new();
        let aggregator = SettingsAggregator::new(&layers, &renderer, "android", "fieldtrip-");

        let result = aggregator.build_settings_document(
            &BTreeMap::new(),
            &json!({"name": "App"}),
            &json!({"title": "Settings"}),
            &json!({}),
        )?;
        let expect = Some("<h>Settings</h><gps>{}</gps>App<f/>".to_string());
        pretty_assertions::assert_eq!(result, expect);

        Ok(())
    }
}
