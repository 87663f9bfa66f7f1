//! Staging directory for minified assets.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::errors::{Error, Result};

/// Uniquely named temporary directory holding minified assets for a single build.
///
/// The directory is removed on [`close()`](Self::close()) or on drop, unless it is kept
/// for inspection.
#[derive(Debug)]
pub struct StagingArea {
    dir: Option<TempDir>,
    path: PathBuf,
    kept: bool,
}

impl StagingArea {
    const PREFIX: &'static str = "iconfont-minify-";

    /// Creates a staging directory in the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(keep: bool) -> Result<Self> {
        Self::create_in(&std::env::temp_dir(), keep)
    }

    /// Creates a staging directory in the specified parent directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create_in(parent: &Path, keep: bool) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(Self::PREFIX)
            .tempdir_in(parent)
            .map_err(Error::Staging)?;
        let path = dir.path().to_owned();
        tracing::debug!(path = %path.display(), keep, "created staging directory");

        Ok(if keep {
            Self {
                dir: None,
                path: dir.keep(),
                kept: true,
            }
        } else {
            Self {
                dir: Some(dir),
                path,
                kept: false,
            }
        })
    }

    /// Returns the path to the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks whether the directory is retained after [`close()`](Self::close()).
    pub fn is_kept(&self) -> bool {
        self.kept
    }

    /// Writes a file into the directory, returning the path to the written file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, file_name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.path.join(file_name);
        fs::write(&path, contents).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Removes the directory unless it is kept. Repeated calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be removed.
    pub fn close(&mut self) -> Result<()> {
        if let Some(dir) = self.dir.take() {
            dir.close().map_err(Error::Staging)?;
            tracing::debug!(path = %self.path.display(), "removed staging directory");
        }
        Ok(())
    }
}
