// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Descriptor resolution across layers.
//!
//! Resolving a descriptor folds every contributing layer's copy into one
//! __merged document context__. The fold always starts from the layer that
//! structurally owns the descriptor:
//!
//! 1. Core has it? Start from core, merge every plugin's copy in plugin
//!    order, then merge the project's copy last.
//! 2. Project has it? Start from project. Plugins are not consulted, because
//!    plugins only enrich documents that core defines.
//! 3. Exactly one plugin ships both the descriptor and its document template?
//!    That plugin owns the document. Start from it and merge the project's
//!    copy on top.
//! 4. Otherwise the descriptor does not exist for generation purposes.

use crate::{
    layer::{document_template, is_reserved, Layer, LayerError, LayerKind, LayerStack},
    merge::merge,
};

use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// A descriptor folded across all contributing layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Descriptor name.
    pub name: String,

    /// Kind of layer the fold started from.
    pub origin: LayerKind,

    /// Identifier of layer the fold started from.
    pub owner: String,

    /// Merged document context.
    pub data: Value,
}

/// Resolve descriptor by name across the layer stack.
///
/// Returns `None` if no layer owns the descriptor.
///
/// # Errors
///
/// - Return [`ResolveError::Layer`] if any contributing descriptor cannot be
///   read or parsed.
/// - Return [`ResolveError::AmbiguousOwner`] if more than one plugin ships
///   a document that neither core nor project define.
#[instrument(skip(layers), level = "debug")]
pub fn resolve_descriptor(name: &str, layers: &LayerStack) -> Result<Option<Resolved>> {
    if let Some(mut data) = layers.core().read_descriptor(name)? {
        for plugin in layers.plugins() {
            merge_from(name, &mut data, plugin.as_ref())?;
        }
        merge_from(name, &mut data, layers.project())?;

        return Ok(Some(Resolved {
            name: name.to_string(),
            origin: LayerKind::Core,
            owner: layers.core().id().to_string(),
            data,
        }));
    }

    if let Some(data) = layers.project().read_descriptor(name)? {
        debug!("descriptor {name:?} defined by project only");
        return Ok(Some(Resolved {
            name: name.to_string(),
            origin: LayerKind::Project,
            owner: layers.project().id().to_string(),
            data,
        }));
    }

    if is_reserved(name) {
        return Ok(None);
    }

    let template = document_template(name);
    let owners = layers
        .plugins()
        .iter()
        .filter(|plugin| plugin.has_descriptor(name) && plugin.has_template(&template))
        .collect::<Vec<_>>();

    let owner = match owners.as_slice() {
        [] => return Ok(None),
        [owner] => owner,
        _ => {
            return Err(ResolveError::AmbiguousOwner {
                name: name.to_string(),
                locations: owners
                    .iter()
                    .map(|plugin| plugin.location().to_path_buf())
                    .collect(),
            })
        }
    };

    let Some(mut data) = owner.read_descriptor(name)? else {
        return Ok(None);
    };
    merge_from(name, &mut data, layers.project())?;

    Ok(Some(Resolved {
        name: name.to_string(),
        origin: LayerKind::Plugin,
        owner: owner.id().to_string(),
        data,
    }))
}

/// Resolve global structural data, e.g., header or footer data.
///
/// A missing descriptor resolves to an empty mapping. Global data folds in
/// the same order as documents, core then plugins then project, so the
/// project has the final say over plugins here too.
///
/// # Errors
///
/// - Return [`ResolveError::Layer`] if any contributing descriptor cannot be
///   read or parsed.
pub fn resolve_global(name: &str, layers: &LayerStack) -> Result<Value> {
    Ok(resolve_descriptor(name, layers)?
        .map(|resolved| resolved.data)
        .unwrap_or_else(|| Value::Object(Map::new())))
}

fn merge_from(name: &str, data: &mut Value, layer: &dyn Layer) -> Result<()> {
    if let Some(overlay) = layer.read_descriptor(name)? {
        info!(
            "DATA: merging {name:?} from {} layer {:?}",
            layer.kind(),
            layer.location().display()
        );
        merge(data, overlay);
    }

    Ok(())
}

/// Descriptor resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Contributing descriptor cannot be read or parsed.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// More than one plugin claims ownership of a document.
    #[error("document {name:?} is provided by more than one plugin: {locations:?}")]
    AmbiguousOwner {
        name: String,
        locations: Vec<PathBuf>,
    },
}

/// Friendly result alias :3
type Result<T, E = ResolveError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::MemoryLayer;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn stack(core: MemoryLayer, project: MemoryLayer, plugins: Vec<MemoryLayer>) -> LayerStack {
        LayerStack::new(
            core,
            project,
            plugins
                .into_iter()
                .map(|plugin| Box::new(plugin) as Box<dyn Layer>),
        )
    }

    fn core() -> MemoryLayer {
        MemoryLayer::new(LayerKind::Core, "core")
    }

    fn project() -> MemoryLayer {
        MemoryLayer::new(LayerKind::Project, "project")
    }

    fn plugin(id: &str) -> MemoryLayer {
        MemoryLayer::new(LayerKind::Plugin, id)
    }

    #[test]
    fn core_then_plugins_then_project() -> anyhow::Result<()> {
        let layers = stack(
            core().with_value("index", &json!({"a": "core", "b": "core", "c": "core"})),
            project().with_value("index", &json!({"c": "project"})),
            vec![
                plugin("one").with_value("index", &json!({"b": "one", "c": "one"})),
                plugin("two").with_value("index", &json!({"b": "two"})),
            ],
        );

        let result = resolve_descriptor("index", &layers)?;
        let expect = Some(Resolved {
            name: "index".into(),
            origin: LayerKind::Core,
            owner: "core".into(),
            data: json!({"a": "core", "b": "two", "c": "project"}),
        });
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn project_only_descriptor_skips_plugins() -> anyhow::Result<()> {
        let layers = stack(
            core(),
            project().with_value("about", &json!({"body": {"a": 1}})),
            vec![plugin("one").with_value("about", &json!({"body": {"b": 2}}))],
        );

        let result = resolve_descriptor("about", &layers)?;
        let expect = Some(Resolved {
            name: "about".into(),
            origin: LayerKind::Project,
            owner: "project".into(),
            data: json!({"body": {"a": 1}}),
        });
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn plugin_override_alone_contributes_nothing() -> anyhow::Result<()> {
        let layers = stack(
            core(),
            project(),
            vec![plugin("one").with_value("ghost", &json!({"body": {"b": 2}}))],
        );

        assert_eq!(resolve_descriptor("ghost", &layers)?, None);

        Ok(())
    }

    #[test]
    fn plugin_owned_document_merges_project() -> anyhow::Result<()> {
        let layers = stack(
            core(),
            project().with_value("gps", &json!({"header": {"title": "GPS!"}})),
            vec![plugin("gps")
                .with_value("gps", &json!({"header": {"title": "GPS"}, "body": {}}))
                .with_template("gps.html", "")],
        );

        let result = resolve_descriptor("gps", &layers)?;
        let expect = Some(Resolved {
            name: "gps".into(),
            origin: LayerKind::Plugin,
            owner: "gps".into(),
            data: json!({"header": {"title": "GPS!"}, "body": {}}),
        });
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn plugin_owned_document_claimed_twice_is_ambiguous() {
        let layers = stack(
            core(),
            project(),
            vec![
                plugin("one").with_value("gps", &json!({})).with_template("gps.html", ""),
                plugin("two").with_value("gps", &json!({})).with_template("gps.html", ""),
            ],
        );

        let result = resolve_descriptor("gps", &layers);
        match result {
            Err(ResolveError::AmbiguousOwner { locations, .. }) => assert_eq!(
                locations,
                vec![PathBuf::from("memory/one"), PathBuf::from("memory/two")]
            ),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn global_missing_resolves_to_empty_map() -> anyhow::Result<()> {
        let layers = stack(core(), project(), vec![]);
        assert_eq!(resolve_global("footer", &layers)?, json!({}));

        Ok(())
    }

    #[test]
    fn global_project_wins_over_plugins() -> anyhow::Result<()> {
        let layers = stack(
            core().with_value("header", &json!({"title": "Core", "back": true})),
            project().with_value("header", &json!({"title": "Project"})),
            vec![plugin("gps").with_value("header", &json!({"title": "GPS", "map": true}))],
        );

        let result = resolve_global("header", &layers)?;
        assert_eq!(result, json!({"title": "Project", "back": true, "map": true}));

        Ok(())
    }

    #[test]
    fn malformed_descriptor_is_fatal() {
        let layers = stack(
            core().with_value("index", &json!({})),
            project(),
            vec![plugin("broken").with_descriptor("index", "{ nope")],
        );

        let result = resolve_descriptor("index", &layers);
        match result {
            Err(ResolveError::Layer(LayerError::Parse { path, .. })) => {
                assert_eq!(path, PathBuf::from("memory/broken/index.json"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
