// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use layerdoc::{
    config::{Config, DEFAULT_CONFIG_PATH},
    generate::{generate, GenerateOptions},
    layer::{resolve_descriptor, LayerStack},
    output::DirSink,
    path::discover_plugins,
    render::JinjaRenderer,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  layerdoc [options] <layerdoc-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Project root that relative paths resolve against.
    #[arg(short, long, default_value = ".", value_name = "dir")]
    pub root: PathBuf,

    /// Configuration file to use instead of the default one.
    #[arg(short, long, value_name = "file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = load_config(&self.root, self.config.as_deref())?;
        match self.command {
            Command::Generate(opts) => run_generate(config, opts),
            Command::Resolve(opts) => run_resolve(config, opts),
            Command::Plugins => run_plugins(config),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Generate every document into the export directory.
    #[command(override_usage = "layerdoc generate [options]")]
    Generate(GenerateCliOptions),

    /// Print merged data of one descriptor.
    #[command(override_usage = "layerdoc resolve <name>")]
    Resolve(ResolveOptions),

    /// List discovered plugin layers.
    #[command(override_usage = "layerdoc plugins")]
    Plugins,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct GenerateCliOptions {
    /// Target platform of generated documents.
    #[arg(short, long, value_enum, default_value_t = Platform::Android)]
    pub platform: Platform,

    /// Pull in the native bridge script.
    #[arg(long)]
    pub cordova: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ResolveOptions {
    /// Name of descriptor to resolve, e.g., `index`.
    #[arg(required = true, value_name = "name")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Platform {
    Android,
    Ios,
}

impl Display for Platform {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Android => fmt.write_str("android"),
            Self::Ios => fmt.write_str("ios"),
        }
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"));
    let filter = match filter {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid log filter: {error}");
            exit(1);
        }
    };
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_config(root: &Path, path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => read_config(path)?,
        None => {
            let path = root.join(DEFAULT_CONFIG_PATH);
            if path.is_file() {
                read_config(&path)?
            } else {
                warn!("no configuration at {:?}, using defaults", path.display());
                Config::default()
            }
        }
    };

    Ok(config.with_root(root))
}

fn read_config(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {:?}", path.display()))?;
    let config: Config = data
        .parse()
        .with_context(|| format!("invalid configuration {:?}", path.display()))?;

    Ok(config)
}

fn open_layers(config: &Config) -> Result<LayerStack> {
    let plugins = discover_plugins(&config.layers)?;
    let layers = LayerStack::open(
        &config.layers.core,
        &config.layers.project,
        plugins.into_iter().map(|plugin| (plugin.id, plugin.path)),
    )?;

    Ok(layers)
}

fn run_generate(config: Config, opts: GenerateCliOptions) -> Result<()> {
    let layers = open_layers(&config)?;
    let options = GenerateOptions {
        platform: opts.platform.to_string(),
        native_bridge: opts.cordova,
        package_prefix: config.layers.package_prefix.clone(),
        install: config.install_value()?,
        settings: config.settings,
    };

    let generation = generate(&layers, &JinjaRenderer::new(), &options)?;
    let mut sink = DirSink::new(config.output.export_dir);
    generation.commit(&mut sink)?;

    Ok(())
}

fn run_resolve(config: Config, opts: ResolveOptions) -> Result<()> {
    let layers = open_layers(&config)?;
    let Some(resolved) = resolve_descriptor(&opts.name, &layers)? else {
        bail!("no layer defines descriptor {:?}", opts.name);
    };

    println!("{}", serde_json::to_string_pretty(&resolved.data)?);

    Ok(())
}

fn run_plugins(config: Config) -> Result<()> {
    for plugin in discover_plugins(&config.layers)? {
        println!("{}\t{}", plugin.id, plugin.path.display());
    }

    Ok(())
}
