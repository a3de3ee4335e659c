use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// File name of the optional per-project configuration.
pub const CONFIG_FILE_NAME: &str = "funcpack.toml";

/// One mebibyte, the unit used for size reporting.
pub const MIB: u64 = 1024 * 1024;

/// funcpack.toml configuration
///
/// Every field has a default, so an absent file (or an empty one) yields the
/// stock Lambda Python 3.12 / x86_64 packaging setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuncpackConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub container: ContainerConfig,
    #[serde(default)]
    pub installer: InstallerConfig,
    #[serde(default)]
    pub assembly: AssemblyConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// Locations relative to the project directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Staging directory, recreated on every run
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
    /// Output archive
    #[serde(default = "default_archive")]
    pub archive: String,
    /// Dependency manifest passed to the installer
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Container runtime executable (docker, podman, ...)
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Build environment image, pinned to the target runtime version
    #[serde(default = "default_image")]
    pub image: String,
    /// Forced container platform
    #[serde(default = "default_container_platform")]
    pub platform: String,
    /// Where the project directory is bind-mounted inside the container
    #[serde(default = "default_mount_point")]
    pub mount_point: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerConfig {
    /// Wheel platform tag handed to `pip install --platform`
    #[serde(default = "default_platform_tag")]
    pub platform_tag: String,
    /// Refuse source distributions (`--only-binary=:all:`)
    #[serde(default = "default_true")]
    pub only_binary: bool,
    /// Force reinstallation of every requirement (`--upgrade`)
    #[serde(default = "default_true")]
    pub upgrade: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Application files copied into the staging root
    #[serde(default = "default_source_files")]
    pub source_files: Vec<String>,
    /// Data directory copied to `<staging>/<data_dir>`
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// Archive size thresholds, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Direct upload limit; exceeding it produces a warning
    #[serde(default = "default_soft_limit")]
    pub soft_limit_bytes: u64,
    /// Deployment limit; exceeding it produces an error-level advisory
    #[serde(default = "default_hard_limit")]
    pub hard_limit_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Last-resort removal command; the path is appended as the final argument.
    /// An empty list disables escalation.
    #[serde(default = "default_escalation_command")]
    pub escalation_command: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            archive: default_archive(),
            manifest: default_manifest(),
        }
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            image: default_image(),
            platform: default_container_platform(),
            mount_point: default_mount_point(),
        }
    }
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            platform_tag: default_platform_tag(),
            only_binary: true,
            upgrade: true,
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            source_files: default_source_files(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            soft_limit_bytes: default_soft_limit(),
            hard_limit_bytes: default_hard_limit(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            escalation_command: default_escalation_command(),
        }
    }
}

impl FuncpackConfig {
    /// Load from funcpack.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            let config: Self = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path.clone(),
                source: e,
            })?;
            config.validate()?;
            tracing::debug!(path = %config_path.display(), "loaded configuration");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        let staging = normalize_relative("paths.staging_dir", &self.paths.staging_dir)?;
        let archive = normalize_relative("paths.archive", &self.paths.archive)?;
        let data_dir = normalize_relative("assembly.data_dir", &self.assembly.data_dir)?;
        normalize_relative("paths.manifest", &self.paths.manifest)?;

        if archive.starts_with(&staging) {
            return Err(crate::Error::InvalidPath {
                field: "paths.archive",
                path: self.paths.archive.clone(),
                reason: "must not be inside paths.staging_dir",
            });
        }

        // copy_tree walks data_dir while writing into staging/data_dir
        if data_dir.starts_with(&staging) || staging.starts_with(&data_dir) {
            return Err(crate::Error::InvalidPath {
                field: "assembly.data_dir",
                path: self.assembly.data_dir.clone(),
                reason: "must not contain or be inside paths.staging_dir",
            });
        }

        if self.limits.soft_limit_bytes > self.limits.hard_limit_bytes {
            return Err(crate::Error::InvalidLimits {
                soft: self.limits.soft_limit_bytes,
                hard: self.limits.hard_limit_bytes,
            });
        }

        Ok(())
    }
}

/// Paths in funcpack.toml are joined onto the project directory and, for the
/// staging directory, removed recursively. Keep them strictly below it.
///
/// Returns the path with `.` components dropped, so that `./pkg` and `pkg`
/// compare equal.
fn normalize_relative(field: &'static str, value: &str) -> crate::Result<PathBuf> {
    let invalid = |reason| crate::Error::InvalidPath {
        field,
        path: value.to_owned(),
        reason,
    };

    if value.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(value).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("must not contain '..'")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("must be relative to the project directory"));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(invalid("must not be the project directory itself"));
    }
    Ok(normalized)
}

fn default_staging_dir() -> String {
    "lambda-package".to_owned()
}

fn default_archive() -> String {
    "lambda-deployment.zip".to_owned()
}

fn default_manifest() -> String {
    "requirements.txt".to_owned()
}

fn default_runtime() -> String {
    "docker".to_owned()
}

fn default_image() -> String {
    "public.ecr.aws/lambda/python:3.12".to_owned()
}

fn default_container_platform() -> String {
    "linux/amd64".to_owned()
}

fn default_mount_point() -> String {
    "/var/task".to_owned()
}

fn default_platform_tag() -> String {
    "manylinux2014_x86_64".to_owned()
}

fn default_true() -> bool {
    true
}

fn default_source_files() -> Vec<String> {
    ["server.py", "lambda_handler.py", "context.py", "resources.py"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

fn default_data_dir() -> String {
    "data".to_owned()
}

fn default_soft_limit() -> u64 {
    50 * MIB
}

fn default_hard_limit() -> u64 {
    250 * MIB
}

fn default_escalation_command() -> Vec<String> {
    vec!["sudo".to_owned(), "rm".to_owned(), "-rf".to_owned()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(FuncpackConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_parent_dir_in_staging() {
        let mut config = FuncpackConfig::default();
        config.paths.staging_dir = "../outside".to_owned();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("paths.staging_dir"), "got: {err}");
    }

    #[test]
    fn rejects_absolute_archive() {
        let mut config = FuncpackConfig::default();
        config.paths.archive = "/tmp/out.zip".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_manifest() {
        let mut config = FuncpackConfig::default();
        config.paths.manifest = "  ".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_archive_equal_to_staging() {
        let mut config = FuncpackConfig::default();
        config.paths.archive = config.paths.staging_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_archive_inside_staging() {
        let mut config = FuncpackConfig::default();
        config.paths.archive = "lambda-package/out.zip".to_owned();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("inside paths.staging_dir"), "got: {err}");
    }

    #[test]
    fn rejects_staging_at_project_root() {
        for value in [".", "./", "./."] {
            let mut config = FuncpackConfig::default();
            config.paths.staging_dir = value.to_owned();
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains("project directory itself"), "{value}: {err}");
        }
    }

    #[test]
    fn rejects_data_dir_at_project_root() {
        let mut config = FuncpackConfig::default();
        config.assembly.data_dir = ".".to_owned();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("assembly.data_dir"), "got: {err}");
    }

    #[test]
    fn rejects_archive_inside_staging_after_normalizing() {
        let mut config = FuncpackConfig::default();
        config.paths.archive = "./lambda-package/out.zip".to_owned();
        assert!(config.validate().is_err());

        let mut config = FuncpackConfig::default();
        config.paths.staging_dir = "./lambda-package".to_owned();
        config.paths.archive = "lambda-package/./out.zip".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_data_dir_overlapping_staging() {
        let mut config = FuncpackConfig::default();
        config.assembly.data_dir = "lambda-package/data".to_owned();
        assert!(config.validate().is_err());

        let mut config = FuncpackConfig::default();
        config.paths.staging_dir = "build/pkg".to_owned();
        config.assembly.data_dir = "build".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_curdir_prefixed_paths() {
        let mut config = FuncpackConfig::default();
        config.paths.staging_dir = "./build/pkg".to_owned();
        config.paths.archive = "./dist/fn.zip".to_owned();
        config.assembly.data_dir = "./data".to_owned();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_limits() {
        let mut config = FuncpackConfig::default();
        config.limits.soft_limit_bytes = 10;
        config.limits.hard_limit_bytes = 5;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("soft limit"), "got: {err}");
    }
}
