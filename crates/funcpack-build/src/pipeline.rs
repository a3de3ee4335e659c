use crate::archive::{ArchiveError, ArchiveSummary, write_archive};
use crate::assemble::{AssembleError, AssemblyReport, assemble};
use crate::cleanup::{CleanupReport, clean};
use crate::size::SizeVerdict;
use funcpack_container::{ContainerClient, ContainerExecutor, InstallError, RealExecutor};
use funcpack_core::{FuncpackConfig, ProjectLayout};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cleanup,
    Dependencies,
    Assembly,
    Packaging,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cleanup => "Cleaning up old artifacts...",
            Self::Dependencies => "Installing dependencies for Lambda runtime...",
            Self::Assembly => "Copying application files...",
            Self::Packaging => "Creating zip file...",
        })
    }
}

/// Progress notifications, delivered in pipeline order.
///
/// Each stage is announced when it starts. Cleanup and assembly also hand
/// over their report as soon as they finish.
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    Started(Stage),
    Cleaned(&'a CleanupReport),
    Assembled(&'a AssemblyReport),
}

/// Result of a complete pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub cleanup: CleanupReport,
    pub assembly: AssemblyReport,
    pub archive: ArchiveSummary,
    pub verdict: SizeVerdict,
}

/// Cleanup → dependency staging → assembly → packaging.
pub struct Pipeline<E: ContainerExecutor = RealExecutor> {
    layout: ProjectLayout,
    config: FuncpackConfig,
    client: ContainerClient<E>,
}

impl Pipeline<RealExecutor> {
    pub fn new(layout: ProjectLayout, config: FuncpackConfig) -> Self {
        let client = ContainerClient::new(&config.container);
        Self {
            layout,
            config,
            client,
        }
    }
}

impl<E: ContainerExecutor> Pipeline<E> {
    pub fn with_client(
        layout: ProjectLayout,
        config: FuncpackConfig,
        client: ContainerClient<E>,
    ) -> Self {
        Self {
            layout,
            config,
            client,
        }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn config(&self) -> &FuncpackConfig {
        &self.config
    }

    /// Run all four stages, reporting through `progress`.
    ///
    /// A dependency staging failure returns before anything is copied or
    /// archived. Size advisories never fail the run; an oversized archive is
    /// left on disk.
    pub async fn run(
        &self,
        mut progress: impl FnMut(Progress<'_>),
    ) -> Result<PackageReport, PipelineError> {
        progress(Progress::Started(Stage::Cleanup));
        let cleanup = clean(&self.layout, &self.config.cleanup);
        progress(Progress::Cleaned(&cleanup));

        std::fs::create_dir_all(&self.layout.staging_dir).map_err(|e| {
            PipelineError::CreateStaging {
                path: self.layout.staging_dir.clone(),
                source: e,
            }
        })?;

        progress(Progress::Started(Stage::Dependencies));
        self.client
            .install_dependencies(&self.layout, &self.config)
            .await
            .map_err(|e| PipelineError::DependencyStaging { source: e })?;

        progress(Progress::Started(Stage::Assembly));
        let assembly = assemble(&self.layout, &self.config)
            .map_err(|e| PipelineError::Assembly { source: e })?;
        progress(Progress::Assembled(&assembly));

        progress(Progress::Started(Stage::Packaging));
        let archive = write_archive(&self.layout.staging_dir, &self.layout.archive)
            .map_err(|e| PipelineError::Archive { source: e })?;
        let verdict = SizeVerdict::classify(archive.size_bytes, &self.config.limits);

        tracing::info!(
            archive = %archive.path.display(),
            entries = archive.entries,
            size_mib = verdict.size_mib(),
            "package created"
        );

        Ok(PackageReport {
            cleanup,
            assembly,
            archive,
            verdict,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to create staging directory {path}")]
    CreateStaging {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("dependency staging failed")]
    DependencyStaging { source: InstallError },
    #[error("failed to assemble application files")]
    Assembly { source: AssembleError },
    #[error("failed to create archive")]
    Archive { source: ArchiveError },
}

impl PipelineError {
    /// `true` for the fatal-to-pipeline dependency staging class.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, Self::DependencyStaging { .. })
    }
}
