// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Output sinks.
//!
//! Rendered documents are handed to an [`OutputSink`] by path relative to
//! the export directory. [`DirSink`] writes them to disk, [`MemorySink`]
//! keeps them around for inspection.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Destination of rendered output text.
pub trait OutputSink {
    /// Write output text to path relative to sink root.
    ///
    /// Existing output at the same path is replaced.
    ///
    /// # Errors
    ///
    /// - Return [`OutputError::Write`] if output cannot be written.
    fn write(&mut self, path: &str, content: &str) -> Result<()>;
}

/// Sink writing outputs below an export directory.
#[derive(Debug, Clone)]
pub struct DirSink {
    root: PathBuf,
}

impl DirSink {
    /// Construct new directory sink rooted at export directory.
    ///
    /// The export directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Export directory of sink.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }
}

impl OutputSink for DirSink {
    #[instrument(skip(self, content), level = "debug")]
    fn write(&mut self, path: &str, content: &str) -> Result<()> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            mkdirp::mkdirp(parent).map_err(|source| OutputError::Write {
                source,
                path: parent.to_path_buf(),
            })?;
        }

        fs::write(&target, content).map_err(|source| OutputError::Write {
            source,
            path: target.clone(),
        })?;
        info!("wrote {:?}", target.display());

        Ok(())
    }
}

/// Sink keeping outputs in memory, ordered by path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemorySink {
    outputs: BTreeMap<String, String>,
}

impl MemorySink {
    /// Construct new empty memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get output written to path.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.outputs.get(path).map(String::as_str)
    }

    /// All written outputs by path.
    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    /// Check if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, path: &str, content: &str) -> Result<()> {
        debug!("store {path:?} in memory");
        self.outputs.insert(path.to_string(), content.to_string());
        Ok(())
    }
}

/// Output error types.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Output cannot be written.
    #[error("failed to write output {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = OutputError> = std::result::Result<T, E>;
