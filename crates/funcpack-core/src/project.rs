//! Resolution of configured paths against a project directory.

use crate::FuncpackConfig;
use std::path::{Path, PathBuf};

/// Absolute locations of everything the pipeline reads and writes.
///
/// # Examples
///
/// ```no_run
/// use funcpack_core::{FuncpackConfig, ProjectLayout};
/// use std::path::Path;
///
/// let config = FuncpackConfig::default();
/// let layout = ProjectLayout::resolve(Path::new("."), &config).unwrap();
/// assert!(layout.staging_dir.ends_with("lambda-package"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Canonical project (working) directory
    pub root: PathBuf,
    /// Staging directory that accumulates archive content
    pub staging_dir: PathBuf,
    /// Final zip archive
    pub archive: PathBuf,
    /// Dependency manifest
    pub manifest: PathBuf,
    /// Optional data directory
    pub data_dir: PathBuf,
}

impl ProjectLayout {
    /// Canonicalize `project_dir` and join each configured path onto it.
    ///
    /// # Errors
    ///
    /// [`Error::ProjectDirResolve`](crate::Error::ProjectDirResolve) if the
    /// directory does not exist or cannot be canonicalized.
    pub fn resolve(project_dir: &Path, config: &FuncpackConfig) -> crate::Result<Self> {
        let root = project_dir
            .canonicalize()
            .map_err(|e| crate::Error::ProjectDirResolve {
                path: project_dir.to_path_buf(),
                source: e,
            })?;

        let layout = Self {
            staging_dir: root.join(&config.paths.staging_dir),
            archive: root.join(&config.paths.archive),
            manifest: root.join(&config.paths.manifest),
            data_dir: root.join(&config.assembly.data_dir),
            root,
        };

        tracing::debug!(
            root = %layout.root.display(),
            staging = %layout.staging_dir.display(),
            archive = %layout.archive.display(),
            "project layout resolved"
        );

        Ok(layout)
    }

    /// Destination of the data directory inside the staging directory.
    pub fn staged_data_dir(&self, config: &FuncpackConfig) -> PathBuf {
        self.staging_dir.join(&config.assembly.data_dir)
    }
}
