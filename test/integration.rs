// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{memory_stack, write_tree, RecordingRenderer};

use anyhow::Result;
use layerdoc::{
    config::Config,
    document::{ComposeError, Composer},
    generate::{generate, GenerateError, GenerateOptions},
    layer::{resolve_descriptor, LayerKind, LayerStack, LocateError, MemoryLayer, TemplateLocator},
    output::DirSink,
    path::discover_plugins,
    render::JinjaRenderer,
};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use serde_json::json;
use std::{
    collections::BTreeMap,
    fs::read_to_string,
    path::{Path, PathBuf},
};

fn plugin(id: &str) -> MemoryLayer {
    MemoryLayer::new(LayerKind::Plugin, id).with_location(format!("plugins/{id}/src/templates"))
}

fn demo_stack() -> LayerStack {
    let core = MemoryLayer::new(LayerKind::Core, "core")
        .with_value("header", &json!({"title": "Home"}))
        .with_value("footer", &json!({"links": ["about"]}))
        .with_template("header.html", "<header>{{ data.title }}</header>")
        .with_template(
            "footer.html",
            "<footer>{% for link in data.links %}{{ link }}{% endfor %}</footer>",
        )
        .with_value(
            "index",
            &json!({
                "body": {"zeta": "z", "alpha": "a"},
                "popups": {"help": {"template": "help.html", "data": {"text": "?"}}},
                "templates": {"main": "main.js"},
            }),
        )
        .with_template(
            "index.html",
            "{{ header }}{% for key, block in body.items() %}[{{ key }}]{% endfor %}{{ popups }}{{ footer }}",
        )
        .with_template("help.html", "<help>{{ data.text }}</help>")
        .with_template("main.js", "start();")
        .with_template("settings.html", "{{ header }}{{ settings }}{{ config.name }}");
    let project = MemoryLayer::new(LayerKind::Project, "project")
        .with_value("index", &json!({"body": {"mid": "m"}}));
    let gps = plugin("fieldtrip-gps")
        .with_value("index", &json!({"body": {"gps": "g"}}))
        .with_template("settings.html", "<gps>{{ settings.interval }}</gps>");

    memory_stack(core, project, [gps])
}

fn demo_options() -> GenerateOptions {
    GenerateOptions {
        package_prefix: "fieldtrip-".into(),
        settings: BTreeMap::from([("gps".into(), r#"{"interval": 5}"#.into())]),
        install: json!({"name": "App"}),
        ..Default::default()
    }
}

#[test]
fn plugin_body_reaches_core_document() -> Result<()> {
    let layers = memory_stack(
        MemoryLayer::new(LayerKind::Core, "core")
            .with_value("index", &json!({"header": {"title": "A"}}))
            .with_template("index.html", "")
            .with_template("header.html", ""),
        MemoryLayer::new(LayerKind::Project, "project"),
        [plugin("gps").with_value("index", &json!({"body": {"b1": "x"}}))],
    );
    let renderer = RecordingRenderer::default();

    let resolved = resolve_descriptor("index", &layers)?
        .ok_or_else(|| anyhow::anyhow!("no index"))?;
    let composer = Composer::new(&layers, &renderer, "android", false);
    let context = composer.context(&resolved, &json!({}), &json!({}))?;
    assert_eq!(context.header, json!({"title": "A"}));
    let keys = context
        .body
        .as_object()
        .map(|body| body.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    assert_eq!(keys, vec!["b1"]);

    let generation = generate(&layers, &renderer, &GenerateOptions::default())?;
    let paths = generation
        .outputs()
        .iter()
        .map(|output| output.path.as_str())
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["index.html"]);
    assert_eq!(
        renderer.context_of("header.html"),
        Some(json!({"data": {"title": "A"}, "platform": "android"}))
    );
    let document = renderer
        .context_of("index.html")
        .ok_or_else(|| anyhow::anyhow!("index never rendered"))?;
    assert_eq!(document["body"], json!({"b1": "x"}));
    assert!(renderer.calls().iter().all(|call| call.layer == "core"));

    Ok(())
}

#[test]
fn generation_composes_every_output() -> Result<()> {
    let layers = demo_stack();
    let generation = generate(&layers, &JinjaRenderer::new(), &demo_options())?;

    let outputs = generation
        .outputs()
        .iter()
        .map(|output| (output.path.as_str(), output.content.as_str()))
        .collect::<Vec<_>>();
    let expect = vec![
        (
            "index.html",
            "<header>Home</header>[alpha][gps][mid][zeta]<help>?</help><footer>about</footer>",
        ),
        ("templates/main.js", "start();"),
        ("settings.html", "<header>Home</header><gps>5</gps>App"),
    ];
    assert_eq!(outputs, expect);

    Ok(())
}

#[test]
fn rerun_is_byte_identical() -> Result<()> {
    let layers = demo_stack();

    let first = generate(&layers, &JinjaRenderer::new(), &demo_options())?;
    let second = generate(&layers, &JinjaRenderer::new(), &demo_options())?;
    assert_eq!(first, second);

    Ok(())
}

#[test]
fn settings_partials_are_ambiguous_for_unique_lookup() {
    let layers = memory_stack(
        MemoryLayer::new(LayerKind::Core, "core"),
        MemoryLayer::new(LayerKind::Project, "project"),
        [
            plugin("gps").with_template("settings.html", ""),
            plugin("sync").with_template("settings.html", ""),
        ],
    );

    let result = TemplateLocator::new(&layers)
        .find("settings.html")
        .unique("settings.html");
    match result {
        Err(LocateError::Ambiguous { locations, .. }) => assert_eq!(
            locations,
            vec![
                PathBuf::from("plugins/gps/src/templates"),
                PathBuf::from("plugins/sync/src/templates"),
            ]
        ),
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn ambiguous_popup_aborts_generation() {
    let layers = memory_stack(
        MemoryLayer::new(LayerKind::Core, "core")
            .with_value("index", &json!({"popups": {"p": {"template": "info.html"}}}))
            .with_template("index.html", ""),
        MemoryLayer::new(LayerKind::Project, "project"),
        [
            plugin("gps").with_template("info.html", ""),
            plugin("sync").with_template("info.html", ""),
        ],
    );

    let result = generate(&layers, &JinjaRenderer::new(), &GenerateOptions::default());
    assert!(matches!(
        result,
        Err(GenerateError::Compose(ComposeError::Locate(
            LocateError::Ambiguous { .. }
        )))
    ));
}

#[sealed_test]
fn generate_from_directory_layers() -> Result<()> {
    write_tree(
        ".",
        [
            ("src/templates/header.json", r#"{"title": "Home"}"#),
            ("src/templates/header.html", "<header>{{ data.title }}</header>"),
            ("src/templates/footer.json", r#"{"links": ["about"]}"#),
            (
                "src/templates/footer.html",
                "<footer>{% for link in data.links %}{{ link }}{% endfor %}</footer>",
            ),
            ("src/templates/index.json", r#"{"body": {"zeta": "z", "alpha": "a"}}"#),
            (
                "src/templates/index.html",
                "{{ header }}{% for key, block in body.items() %}[{{ key }}]{% endfor %}{{ footer }}",
            ),
            ("src/templates/about.json", r#"{"footer": {}}"#),
            ("src/templates/about.html", "{{ header }}about{{ footer }}"),
            ("src/templates/settings.html", "{{ header }}{{ settings }}{{ config.name }}"),
            ("project/src/templates/index.json", r#"{"body": {"mid": "m"}}"#),
            ("plugins/gps/main/templates/index.json", r#"{"body": {"gps": "g"}}"#),
            (
                "plugins/gps/main/templates/settings.html",
                "<gps>{{ settings.interval }}</gps>",
            ),
            (
                "src/www/theme/project.json",
                r#"{"plugins": {"fieldtrip": {"sync": "1.0.0"}}}"#,
            ),
            (
                "bower_components/fieldtrip-sync/src/templates/settings.html",
                "<sync>{{ settings }}</sync>",
            ),
        ],
    )?;

    let config: Config = r#"
        [install]
        name = "App"

        [settings]
        gps = '{"interval": 5}'
        sync = "daily"
    "#
    .parse()?;
    let config = config.with_root(".");

    let plugins = discover_plugins(&config.layers)?;
    let ids = plugins
        .iter()
        .map(|plugin| plugin.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["gps", "fieldtrip-sync"]);

    let layers = LayerStack::open(
        &config.layers.core,
        &config.layers.project,
        plugins.into_iter().map(|plugin| (plugin.id, plugin.path)),
    )?;
    let options = GenerateOptions {
        package_prefix: config.layers.package_prefix.clone(),
        settings: config.settings.clone(),
        install: config.install_value()?,
        ..Default::default()
    };
    let generation = generate(&layers, &JinjaRenderer::new(), &options)?;
    generation.commit(&mut DirSink::new(&config.output.export_dir))?;

    let export = Path::new("src/www");
    assert_eq!(
        read_to_string(export.join("index.html"))?,
        "<header>Home</header>[alpha][gps][mid][zeta]<footer>about</footer>"
    );
    assert_eq!(
        read_to_string(export.join("about.html"))?,
        "<header>Home</header>about<footer></footer>"
    );
    assert_eq!(
        read_to_string(export.join("settings.html"))?,
        "<header>Home</header><gps>5</gps>\n<sync>daily</sync>App"
    );

    let before = read_to_string(export.join("index.html"))?;
    generate(&layers, &JinjaRenderer::new(), &options)?
        .commit(&mut DirSink::new(&config.output.export_dir))?;
    assert_eq!(read_to_string(export.join("index.html"))?, before);

    Ok(())
}

#[sealed_test]
fn failed_generation_writes_nothing() -> Result<()> {
    write_tree(
        "core",
        [
            ("good.json", "{}"),
            ("good.html", "fine"),
            ("index.json", r#"{"popups": {"p": {"template": "gone.html"}}}"#),
            ("index.html", ""),
        ],
    )?;
    let layers = LayerStack::open("core", "project", Vec::<(String, PathBuf)>::new())?;

    let result = generate(&layers, &JinjaRenderer::new(), &GenerateOptions::default())
        .and_then(|generation| generation.commit(&mut DirSink::new("out")));
    assert!(matches!(
        result,
        Err(GenerateError::Compose(ComposeError::Locate(
            LocateError::Missing { .. }
        )))
    ));
    assert!(!Path::new("out").exists());

    Ok(())
}

#[sealed_test]
fn unrelated_assets_leave_documents_alone() -> Result<()> {
    write_tree(
        "core",
        [
            ("index.json", r#"{"body": {"b1": "x"}}"#),
            ("index.html", "{% for key, block in body.items() %}{{ key }}{% endfor %}"),
            ("js/lib.js", "var re = /{#/;"),
        ],
    )?;
    std::fs::write("core/logo.png", [0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe, 0x00])?;
    let layers = LayerStack::open("core", "project", Vec::<(String, PathBuf)>::new())?;

    let generation = generate(&layers, &JinjaRenderer::new(), &GenerateOptions::default())?;
    let index = generation.get("index.html").map(|output| output.content.as_str());
    assert_eq!(index, Some("b1"));

    Ok(())
}
