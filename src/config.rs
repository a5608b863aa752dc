// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that layerdoc uses to
//! simplify the process of serialization and deserialization. File I/O is
//! left to the caller to figure out.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default location of configuration file relative to project root.
pub const DEFAULT_CONFIG_PATH: &str = "etc/config.toml";

/// Configuration layout.
///
/// # General Layout
///
/// The configuration is composed of four sections, all of them optional:
///
/// - `[layers]`: where the core, project, and plugin layers live.
/// - `[output]`: where generated documents are exported to.
/// - `[install]`: free-form installation details handed to the settings
///   document as `config`.
/// - `[settings]`: external settings values keyed by plugin identifier.
#[derive(Default, Debug, PartialEq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Layer locations.
    pub layers: LayerSettings,

    /// Export settings.
    pub output: OutputSettings,

    /// Installation details.
    pub install: toml::Table,

    /// External settings values.
    pub settings: BTreeMap<String, String>,
}

impl Config {
    /// Resolve every relative path against project root.
    ///
    /// Absolute paths are left untouched.
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let layers = &mut self.layers;
        for path in [
            &mut layers.core,
            &mut layers.project,
            &mut layers.plugin_root,
            &mut layers.manifest,
            &mut layers.package_dir,
            &mut self.output.export_dir,
        ]
        .into_iter()
        .chain(layers.plugins.iter_mut())
        {
            *path = root.join(&*path);
        }

        self
    }

    /// Installation details as structured data.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Install`] if installation details cannot be
    ///   represented as structured data.
    pub fn install_value(&self) -> Result<Value> {
        serde_json::to_value(&self.install).map_err(ConfigError::Install)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: Config = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        let layers = &mut config.layers;
        for path in [
            &mut layers.core,
            &mut layers.project,
            &mut layers.plugin_root,
            &mut layers.manifest,
            &mut layers.package_dir,
            &mut config.output.export_dir,
        ]
        .into_iter()
        .chain(layers.plugins.iter_mut())
        {
            *path = expand(&*path)?;
        }

        Ok(config)
    }
}

impl Display for Config {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Layer location settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LayerSettings {
    /// Root of core layer.
    pub core: PathBuf,

    /// Root of project layer.
    pub project: PathBuf,

    /// Directory holding the `plugins/` directory.
    pub plugin_root: PathBuf,

    /// Project manifest listing package plugins.
    pub manifest: PathBuf,

    /// Directory that package plugins are installed to.
    pub package_dir: PathBuf,

    /// Name prefix of package plugins.
    pub package_prefix: String,

    /// Extra plugin layer roots, applied after discovered plugins.
    pub plugins: Vec<PathBuf>,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            core: "src/templates".into(),
            project: "project/src/templates".into(),
            plugin_root: ".".into(),
            manifest: "src/www/theme/project.json".into(),
            package_dir: "bower_components".into(),
            package_prefix: "fieldtrip-".into(),
            plugins: Vec::new(),
        }
    }
}

/// Export settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory generated documents are written to.
    pub export_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            export_dir: "src/www".into(),
        }
    }
}

fn expand(path: &Path) -> Result<PathBuf> {
    Ok(shellexpand::full(path.to_string_lossy().as_ref())
        .map_err(ConfigError::ShellExpansion)?
        .into_owned()
        .into())
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Installation details are not representable as structured data.
    #[error("invalid installation details")]
    Install(#[source] serde_json::Error),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
