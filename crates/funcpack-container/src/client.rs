use crate::executor::{ContainerExecutor, RealExecutor};
use crate::runtime::ContainerError;
use funcpack_core::{ContainerConfig, FuncpackConfig, InstallerConfig, ProjectLayout};
use std::fmt;
use std::path::PathBuf;

/// Container runtime operations, parameterized over the executor for testability.
pub struct ContainerClient<E: ContainerExecutor = RealExecutor> {
    executor: E,
}

impl ContainerClient<RealExecutor> {
    /// Client for the runtime named in `[container].runtime`.
    pub fn new(config: &ContainerConfig) -> Self {
        Self {
            executor: RealExecutor::new(config.runtime.as_str()),
        }
    }
}

impl<E: ContainerExecutor> ContainerClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Dependency staging ──

    /// Install the manifest's dependencies into the staging directory by
    /// running the package installer inside the pinned build image.
    ///
    /// The staging directory must already exist; the container writes into
    /// it through the bind mount of the project root.
    pub async fn install_dependencies(
        &self,
        layout: &ProjectLayout,
        config: &FuncpackConfig,
    ) -> Result<(), InstallError> {
        if !layout.manifest.is_file() {
            return Err(InstallError::ManifestMissing(layout.manifest.clone()));
        }

        let args = install_args(layout, config)?;
        tracing::info!(
            image = %config.container.image,
            platform = %config.container.platform,
            "installing dependencies in build container"
        );

        self.executor
            .exec_streaming(&args)
            .await
            .map_err(|e| InstallError::Run {
                runtime: config.container.runtime.clone(),
                source: e,
            })
    }

    // ── Doctor ──

    /// Check the runtime CLI and its daemon without early return.
    ///
    /// The manifest and config file checks are filled in by the caller.
    pub async fn doctor(&self) -> DoctorReport {
        let mut report = DoctorReport::default();

        // 1. Runtime CLI
        match self
            .executor
            .exec(&args(["version", "--format", "{{.Client.Version}}"]))
            .await
        {
            Ok(v) => report.runtime = CheckResult::ok(v.trim()),
            Err(ContainerError::NotFound { program, .. }) => {
                report.runtime = CheckResult::fail(&format!("{program} not found on PATH"));
            }
            Err(e) => report.runtime = CheckResult::fail(&e.to_string()),
        }

        // 2. Daemon reachable
        match self
            .executor
            .exec(&args(["info", "--format", "{{.ServerVersion}}"]))
            .await
        {
            Ok(v) if !v.trim().is_empty() => {
                report.daemon = CheckResult::ok(&format!("server {}", v.trim()));
            }
            Ok(_) => report.daemon = CheckResult::fail("daemon reported no server version"),
            Err(e) => {
                tracing::debug!(error = %e, "daemon check failed");
                report.daemon = CheckResult::fail("daemon not reachable; is it running?");
            }
        }

        report
    }
}

/// Build the full `run` invocation for the dependency installer.
///
/// ```text
/// run --rm -v <root>:<mount> --platform <platform> --entrypoint "" <image>
///     /bin/sh -c "pip install --target <mount>/<staging> -r <mount>/<manifest> ..."
/// ```
pub fn install_args(
    layout: &ProjectLayout,
    config: &FuncpackConfig,
) -> Result<Vec<String>, InstallError> {
    let root = layout
        .root
        .to_str()
        .ok_or_else(|| InstallError::InvalidPath(layout.root.clone()))?;
    let container = &config.container;

    let mut argv = args([
        "run",
        "--rm",
        "-v",
        &format!("{root}:{mount}", mount = container.mount_point),
        "--platform",
        &container.platform,
        "--entrypoint",
        "",
        &container.image,
        "/bin/sh",
        "-c",
    ]);
    argv.push(pip_command(config));
    Ok(argv)
}

/// Shell command line run inside the build container.
pub fn pip_command(config: &FuncpackConfig) -> String {
    let mount = config.container.mount_point.trim_end_matches('/');
    let target = in_container(mount, &config.paths.staging_dir);
    let manifest = in_container(mount, &config.paths.manifest);
    let InstallerConfig {
        platform_tag,
        only_binary,
        upgrade,
    } = &config.installer;

    let mut words = vec![
        "pip".to_owned(),
        "install".to_owned(),
        "--target".to_owned(),
        sh_quote(&target),
        "-r".to_owned(),
        sh_quote(&manifest),
        "--platform".to_owned(),
        sh_quote(platform_tag),
    ];
    if *only_binary {
        words.push("--only-binary=:all:".to_owned());
    }
    if *upgrade {
        words.push("--upgrade".to_owned());
    }
    words.join(" ")
}

/// Map a project-relative path onto the container mount, always with `/`.
fn in_container(mount: &str, relative: &str) -> String {
    let relative = relative.replace('\\', "/");
    format!("{mount}/{}", relative.trim_start_matches("./"))
}

fn sh_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+@%,".contains(c));
    if safe {
        word.to_owned()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("project path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    #[error("dependency manifest not found at {0}")]
    ManifestMissing(PathBuf),

    #[error(
        "failed to install dependencies with {runtime}; make sure {runtime} is running and you have internet access"
    )]
    Run {
        runtime: String,
        source: ContainerError,
    },
}

// ── Doctor types ──

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub runtime: CheckResult,
    pub daemon: CheckResult,
    pub manifest: CheckResult,
    pub config_file: CheckResult,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        self.runtime.passed && self.daemon.passed && self.manifest.passed && self.config_file.passed
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Container runtime", &self.runtime),
            ("Runtime daemon", &self.daemon),
            ("Dependency manifest", &self.manifest),
            ("Config file", &self.config_file),
        ];
        for (label, check) in rows {
            writeln!(f, "  [{}] {label:<20} {}", check.icon(), check.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}
