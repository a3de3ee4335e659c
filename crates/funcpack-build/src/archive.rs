//! Zip archive creation from the staging directory.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    /// Number of file entries written
    pub entries: usize,
    pub size_bytes: u64,
}

/// Write every regular file under `staging_dir` into a deflate-compressed
/// zip at `archive_path`, named by its path relative to `staging_dir`.
///
/// Entries are written in file-name order with a fixed timestamp, so the
/// same staging content always yields the same archive bytes. Directory
/// entries are not stored.
pub fn write_archive(
    staging_dir: &Path,
    archive_path: &Path,
) -> Result<ArchiveSummary, ArchiveError> {
    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArchiveError::Create {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let file = File::create(archive_path).map_err(|e| ArchiveError::Create {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut entries = 0;
    for entry in WalkDir::new(staging_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ArchiveError::Walk {
            path: staging_dir.to_path_buf(),
            source: e,
        })?;
        if !is_file_entry(&entry) {
            continue;
        }

        let name = entry_name(staging_dir, entry.path())?;
        let mut src = File::open(entry.path()).map_err(|e| ArchiveError::Read {
            path: entry.path().to_path_buf(),
            source: e,
        })?;

        zip.start_file(name.as_str(), options.unix_permissions(file_mode(entry.path())))
            .map_err(|e| ArchiveError::Zip {
                entry: name.clone(),
                source: e,
            })?;
        std::io::copy(&mut src, &mut zip).map_err(|e| ArchiveError::Read {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
        entries += 1;
    }

    let mut writer = zip.finish().map_err(|e| ArchiveError::Zip {
        entry: "<central directory>".to_owned(),
        source: e,
    })?;
    writer.flush().map_err(|e| ArchiveError::Create {
        path: archive_path.to_path_buf(),
        source: e,
    })?;

    let size_bytes = std::fs::metadata(archive_path)
        .map_err(|e| ArchiveError::Read {
            path: archive_path.to_path_buf(),
            source: e,
        })?
        .len();

    tracing::debug!(
        path = %archive_path.display(),
        entries,
        size_bytes,
        "archive written"
    );

    Ok(ArchiveSummary {
        path: archive_path.to_path_buf(),
        entries,
        size_bytes,
    })
}

/// Regular files, plus symlinks that resolve to a regular file.
fn is_file_entry(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

/// Archive entry name: relative to `root`, `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ArchiveError::InvalidEntry(path.to_path_buf()))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            std::path::Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| ArchiveError::InvalidEntry(path.to_path_buf()))?,
            ),
            _ => return Err(ArchiveError::InvalidEntry(path.to_path_buf())),
        }
    }
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.permissions().mode() & 0o777,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "using default mode");
            0o644
        }
    }
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
    0o644
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to create archive {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk staging directory {path}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("cannot name archive entry for {0}")]
    InvalidEntry(PathBuf),
    #[error("failed to write archive entry {entry}")]
    Zip {
        entry: String,
        source: zip::result::ZipError,
    },
}
