//! Transient build context directory.
//!
//! The context is created fresh for each build and removed when dropped.

use std::path::{Path, PathBuf};

use imagefixture_common::error::{FixtureError, Result};
use tempfile::TempDir;

const CONTEXT_PREFIX: &str = "imagefixture-ctx-";

/// Exclusively owned directory holding the files sent to the engine.
#[derive(Debug)]
pub struct BuildContext {
    dir: TempDir,
}

impl BuildContext {
    /// Creates an empty context, inside `root` when given, otherwise in the
    /// system temp directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        let _ = builder.prefix(CONTEXT_PREFIX);
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|e| FixtureError::Io {
                    path: root.to_path_buf(),
                    source: e,
                })?;
                builder.tempdir_in(root).map_err(|e| FixtureError::Io {
                    path: root.to_path_buf(),
                    source: e,
                })?
            }
            None => builder.tempdir().map_err(|e| FixtureError::Io {
                path: std::env::temp_dir(),
                source: e,
            })?,
        };
        tracing::debug!(path = %dir.path().display(), "build context created");
        Ok(Self { dir })
    }

    /// Root of the context.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Destination for a file named `name` at the context root.
    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Names of the files currently at the context root, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn entries(&self) -> Result<Vec<String>> {
        let read = std::fs::read_dir(self.path()).map_err(|e| FixtureError::Io {
            path: self.path().to_path_buf(),
            source: e,
        })?;
        let mut names = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| FixtureError::Io {
                path: self.path().to_path_buf(),
                source: e,
            })?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
