// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where plugin layers live on disk. Plugins come from two places:
//!
//! - __Directory plugins__: checked out below `plugins/<id>/<dir>/templates`
//!   of the plugin root.
//! - __Package plugins__: listed in the project manifest under
//!   `plugins.fieldtrip` with a release version, and installed below the
//!   package directory as `<prefix><name>/src/templates`.
//!
//! Explicitly configured plugin roots are appended after both.

use crate::config::LayerSettings;

use glob::{MatchOptions, Pattern};
use regex_lite::Regex;
use serde_json::Value;
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Version pattern marking a manifest entry as a released package.
pub const RELEASE_VERSION: &str = r"^v?\d+\.\d+\.\d+";

/// Location of one plugin layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PluginRoot {
    /// Plugin identifier.
    pub id: String,

    /// Root of plugin layer.
    pub path: PathBuf,
}

impl PluginRoot {
    /// Construct new plugin root.
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    /// Construct plugin root from explicit path.
    ///
    /// The identifier is the closest ancestor directory name that is
    /// neither `templates` nor `src`, e.g., `gps` for `../gps/src/templates`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .components()
            .rev()
            .filter_map(|component| component.as_os_str().to_str())
            .find(|name| !matches!(*name, "templates" | "src" | "." | ".." | "/" | ""))
            .unwrap_or("plugin")
            .to_string();

        Self { id, path }
    }
}

/// Discover every plugin layer root from layer settings.
///
/// Directory plugins come first, then package plugins, then explicit plugin
/// roots. Each group is sorted.
///
/// # Errors
///
/// - Return any error of [`directory_plugins`] or [`package_plugins`].
#[instrument(skip(settings), level = "debug")]
pub fn discover_plugins(settings: &LayerSettings) -> Result<Vec<PluginRoot>> {
    let mut plugins = directory_plugins(&settings.plugin_root)?;
    plugins.extend(package_plugins(
        &settings.manifest,
        &settings.package_dir,
        &settings.package_prefix,
    )?);
    plugins.extend(settings.plugins.iter().cloned().map(PluginRoot::from_path));

    for plugin in &plugins {
        info!("plugin {:?} at {:?}", plugin.id, plugin.path.display());
    }

    Ok(plugins)
}

/// Find directory plugins below plugin root.
///
/// Hidden plugin and subdirectory names are skipped.
///
/// # Errors
///
/// - Return [`DiscoveryError::Pattern`] if plugin root cannot be turned into
///   a search pattern.
/// - Return [`DiscoveryError::Glob`] if a candidate cannot be inspected.
pub fn directory_plugins(plugin_root: &Path) -> Result<Vec<PluginRoot>> {
    let root = Pattern::escape(plugin_root.to_string_lossy().as_ref());
    let pattern = format!("{root}/plugins/*/*/templates");
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..Default::default()
    };

    let mut plugins = Vec::new();
    for entry in glob::glob_with(&pattern, options)? {
        let path = entry?;
        if !path.is_dir() {
            continue;
        }

        let Some(id) = path
            .parent()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
        else {
            continue;
        };
        plugins.push(PluginRoot::new(id, path.clone()));
    }
    plugins.sort();
    debug!("found {} directory plugins", plugins.len());

    Ok(plugins)
}

/// Find installed package plugins listed in project manifest.
///
/// A missing manifest lists no plugins. Listed packages that are not
/// installed are skipped with a warning.
///
/// # Errors
///
/// - Return [`DiscoveryError::Read`] if manifest cannot be read.
/// - Return [`DiscoveryError::Parse`] if manifest is malformed.
pub fn package_plugins(
    manifest: &Path,
    package_dir: &Path,
    prefix: &str,
) -> Result<Vec<PluginRoot>> {
    if !manifest.is_file() {
        debug!("no manifest at {:?}", manifest.display());
        return Ok(Vec::new());
    }

    let data = read_to_string(manifest).map_err(|source| DiscoveryError::Read {
        source,
        path: manifest.to_path_buf(),
    })?;
    let data: Value = serde_json::from_str(&data).map_err(|source| DiscoveryError::Parse {
        source,
        path: manifest.to_path_buf(),
    })?;

    let Some(listing) = data
        .pointer("/plugins/fieldtrip")
        .and_then(Value::as_object)
    else {
        return Ok(Vec::new());
    };

    let release = Regex::new(RELEASE_VERSION)?;
    let mut plugins = Vec::new();
    for (name, version) in listing {
        let Some(version) = version.as_str() else {
            continue;
        };
        if !release.is_match(version) {
            debug!("plugin {name:?} is not a released package");
            continue;
        }

        let id = format!("{prefix}{name}");
        let path = package_dir.join(&id).join("src").join("templates");
        if !path.is_dir() {
            warn!("package plugin {id:?} is not installed at {:?}", path.display());
            continue;
        }
        plugins.push(PluginRoot::new(id, path));
    }
    plugins.sort();

    Ok(plugins)
}

/// Plugin discovery error types.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Plugin search pattern is invalid.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Plugin candidate cannot be inspected.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    /// Release version pattern is invalid.
    #[error(transparent)]
    Version(#[from] regex_lite::Error),

    /// Manifest cannot be read.
    #[error("failed to read manifest {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Manifest is malformed.
    #[error("malformed manifest {:?}", path.display())]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = DiscoveryError> = std::result::Result<T, E>;
