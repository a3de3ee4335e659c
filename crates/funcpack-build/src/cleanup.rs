//! Removal of the previous run's staging directory and archive.
//!
//! Removal never fails the pipeline. Each path goes through at most three
//! attempts:
//!
//! 1. plain removal
//! 2. restore owner write permission on the whole path, then remove again
//!    (installed packages sometimes ship read-only files)
//! 3. run the configured escalation command (default `sudo rm -rf <path>`);
//!    its outcome is logged and otherwise discarded
//!
//! Step 3 is an accepted risk: whether the path is actually gone is only
//! known to the next stage.

use funcpack_core::{CleanupConfig, ProjectLayout};
use serde::Serialize;
use std::path::Path;
use std::process::Command;
use walkdir::WalkDir;

/// What happened to one path during cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Removal {
    NotPresent,
    Removed,
    RemovedAfterPermissionFix,
    /// Both local attempts failed and the escalation command was run
    /// (or skipped because none is configured).
    Escalated { error: String },
}

impl Removal {
    /// `true` when the removal needed the escalation fallback.
    pub fn is_escalated(&self) -> bool {
        matches!(self, Self::Escalated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub staging: Removal,
    pub archive: Removal,
}

/// Remove the staging directory and the archive left by a previous run.
pub fn clean(layout: &ProjectLayout, config: &CleanupConfig) -> CleanupReport {
    CleanupReport {
        staging: remove_path(&layout.staging_dir, config),
        archive: remove_path(&layout.archive, config),
    }
}

/// Remove a file or directory tree, applying the retry policy.
pub fn remove_path(path: &Path, config: &CleanupConfig) -> Removal {
    // symlink_metadata: a dangling symlink still counts as present
    let is_dir = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta.is_dir(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Removal::NotPresent,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "cannot stat path; attempting removal anyway"
            );
            path.is_dir()
        }
    };

    let first = match remove(path, is_dir) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed");
            return Removal::Removed;
        }
        Err(e) => e,
    };

    tracing::warn!(
        path = %path.display(),
        error = %first,
        "removal failed; restoring write permission and retrying"
    );
    make_writable(path);

    let second = match remove(path, is_dir) {
        Ok(()) => return Removal::RemovedAfterPermissionFix,
        Err(e) => e,
    };

    tracing::warn!(path = %path.display(), error = %second, "could not remove path");
    escalate(path, &config.escalation_command);
    Removal::Escalated {
        error: second.to_string(),
    }
}

fn remove(path: &Path, is_dir: bool) -> std::io::Result<()> {
    if is_dir {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Grant the owner write (and, for directories, search) permission on
/// `path` and everything below it.
fn make_writable(path: &Path) {
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.path_is_symlink() {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(e) => {
                tracing::debug!(path = %entry.path().display(), error = %e, "skipping entry");
                continue;
            }
        };
        let perms = writable(meta.permissions(), meta.is_dir());
        if let Err(e) = std::fs::set_permissions(entry.path(), perms) {
            tracing::debug!(
                path = %entry.path().display(),
                error = %e,
                "failed to set permissions"
            );
        }
    }
}

#[cfg(unix)]
fn writable(perms: std::fs::Permissions, is_dir: bool) -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt;

    let extra = if is_dir { 0o700 } else { 0o600 };
    std::fs::Permissions::from_mode(perms.mode() | extra)
}

#[cfg(not(unix))]
fn writable(mut perms: std::fs::Permissions, _is_dir: bool) -> std::fs::Permissions {
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    perms
}

/// Run the escalation command with `path` appended. The result is logged only.
fn escalate(path: &Path, command: &[String]) {
    let Some((program, args)) = command.split_first() else {
        tracing::warn!(
            path = %path.display(),
            "no escalation command configured; leaving path in place"
        );
        return;
    };

    tracing::warn!(path = %path.display(), command = ?command, "escalating removal");
    match Command::new(program).args(args).arg(path).status() {
        Ok(status) if status.success() => {
            tracing::info!(path = %path.display(), "escalated removal succeeded");
        }
        Ok(status) => {
            tracing::warn!(
                path = %path.display(),
                %status,
                "escalated removal failed; continuing"
            );
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "could not run escalation command; continuing"
            );
        }
    }
}
