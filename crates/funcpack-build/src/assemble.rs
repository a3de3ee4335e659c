//! Copies first-party files on top of the staged dependencies.
//!
//! Missing inputs are skipped with a warning. A listed source file that
//! exists but cannot be copied is an error.

use filetime::FileTime;
use funcpack_core::{FuncpackConfig, ProjectLayout};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    /// Source files copied into the staging root
    pub copied: Vec<String>,
    /// Listed source files that were not found
    pub missing: Vec<String>,
    pub data_dir: DataDirStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DataDirStatus {
    Copied { files: usize },
    Missing,
}

impl AssemblyReport {
    /// Human-readable warnings for every skipped input.
    pub fn warnings(&self, config: &FuncpackConfig) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .missing
            .iter()
            .map(|name| format!("{name} not found, skipping"))
            .collect();
        if self.data_dir == DataDirStatus::Missing {
            warnings.push(format!("{}/ directory not found", config.assembly.data_dir));
        }
        warnings
    }
}

/// Copy the configured source files and the data directory into the
/// staging directory, creating it if needed.
pub fn assemble(
    layout: &ProjectLayout,
    config: &FuncpackConfig,
) -> Result<AssemblyReport, AssembleError> {
    std::fs::create_dir_all(&layout.staging_dir).map_err(|e| AssembleError::Create {
        path: layout.staging_dir.clone(),
        source: e,
    })?;

    let mut copied = Vec::new();
    let mut missing = Vec::new();

    for name in &config.assembly.source_files {
        let src = layout.root.join(name);
        if !src.is_file() {
            tracing::warn!(file = %name, "source file not found, skipping");
            missing.push(name.clone());
            continue;
        }

        let file_name = src
            .file_name()
            .ok_or_else(|| AssembleError::InvalidSource(src.clone()))?;
        copy_preserving_times(&src, &layout.staging_dir.join(file_name))?;
        tracing::debug!(file = %name, "copied source file");
        copied.push(name.clone());
    }

    let data_dir = if layout.data_dir.is_dir() {
        let files = copy_tree(&layout.data_dir, &layout.staged_data_dir(config))?;
        tracing::info!(files, dir = %config.assembly.data_dir, "copied data directory");
        DataDirStatus::Copied { files }
    } else {
        tracing::warn!(dir = %config.assembly.data_dir, "data directory not found");
        DataDirStatus::Missing
    };

    Ok(AssemblyReport {
        copied,
        missing,
        data_dir,
    })
}

/// Recursively copy `src` into `dst`, merging with whatever `dst` already
/// holds. Files at the same relative path are overwritten. Returns the
/// number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize, AssembleError> {
    let mut files = 0;

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| AssembleError::Walk {
            path: src.to_path_buf(),
            source: e,
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| AssembleError::InvalidSource(entry.path().to_path_buf()))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| AssembleError::Create {
                path: target.clone(),
                source: e,
            })?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| AssembleError::Create {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            copy_preserving_times(entry.path(), &target)?;
            files += 1;
        }
    }

    Ok(files)
}

/// Copy a file with its permissions and access/modification times.
fn copy_preserving_times(src: &Path, dst: &Path) -> Result<(), AssembleError> {
    std::fs::copy(src, dst).map_err(|e| AssembleError::CopyFile {
        path: src.to_path_buf(),
        source: e,
    })?;

    let meta = std::fs::metadata(src).map_err(|e| AssembleError::CopyFile {
        path: src.to_path_buf(),
        source: e,
    })?;
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .map_err(|e| AssembleError::Timestamps {
        path: dst.to_path_buf(),
        source: e,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("failed to create directory {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy file {path}")]
    CopyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to preserve timestamps on {path}")]
    Timestamps {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk {path}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("invalid source path {0}")]
    InvalidSource(PathBuf),
}
