use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use funcpack_build::{DataDirStatus, Pipeline, PipelineError, Progress, Removal, Stage};
use funcpack_container::{ContainerClient, ContainerError, ContainerExecutor};
use funcpack_core::{FuncpackConfig, LimitsConfig, ProjectLayout};
use mockall::mock;
use tempfile::TempDir;

mock! {
    Executor {}

    impl ContainerExecutor for Executor {
        async fn exec(&self, args: &[String]) -> Result<String, ContainerError>;
        async fn exec_streaming(&self, args: &[String]) -> Result<(), ContainerError>;
    }
}

fn write_project(dir: &Path) {
    std::fs::write(dir.join("requirements.txt"), "requests\n").unwrap();
    for name in ["server.py", "lambda_handler.py", "context.py", "resources.py"] {
        std::fs::write(dir.join(name), format!("# {name}\n")).unwrap();
    }
    std::fs::create_dir_all(dir.join("data")).unwrap();
    std::fs::write(dir.join("data/facts.json"), "{}").unwrap();
}

/// Executor that behaves like a successful `pip install --target <staging>`.
fn installing_executor(staging: PathBuf) -> MockExecutor {
    let mut mock = MockExecutor::new();
    mock.expect_exec_streaming().returning(move |_| {
        let pkg = staging.join("requests");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("__init__.py"), "__version__ = '2.32.3'\n").unwrap();
        std::fs::write(pkg.join("api.py"), "def get(url): ...\n").unwrap();
        Ok(())
    });
    mock
}

fn failing_executor() -> MockExecutor {
    let mut mock = MockExecutor::new();
    mock.expect_exec_streaming().times(1).returning(|args| {
        Err(ContainerError::CommandFailed {
            program: "docker".to_owned(),
            args: args.to_vec(),
            stderr: "exit code: exit status: 1".to_owned(),
        })
    });
    mock
}

fn pipeline(dir: &Path, config: FuncpackConfig, mock: MockExecutor) -> Pipeline<MockExecutor> {
    let layout = ProjectLayout::resolve(dir, &config).unwrap();
    Pipeline::with_client(layout, config, ContainerClient::with_executor(mock))
}

fn archive_names(path: &Path) -> BTreeSet<String> {
    let zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    zip.file_names().map(str::to_owned).collect()
}

#[tokio::test]
async fn full_run_packages_dependencies_sources_and_data() {
    let tmp = TempDir::new().unwrap();
    write_project(tmp.path());
    let config = FuncpackConfig::default();
    let layout = ProjectLayout::resolve(tmp.path(), &config).unwrap();

    let mut stages = Vec::new();
    let report = pipeline(tmp.path(), config, installing_executor(layout.staging_dir.clone()))
        .run(|progress| {
            if let Progress::Started(stage) = progress {
                stages.push(stage);
            }
        })
        .await
        .unwrap();

    assert_eq!(
        stages,
        vec![Stage::Cleanup, Stage::Dependencies, Stage::Assembly, Stage::Packaging]
    );

    let expected: BTreeSet<String> = [
        "context.py",
        "data/facts.json",
        "lambda_handler.py",
        "requests/__init__.py",
        "requests/api.py",
        "resources.py",
        "server.py",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect();
    assert_eq!(archive_names(&layout.archive), expected);
    assert_eq!(report.archive.entries, expected.len());
    assert!(report.verdict.within_limits());
    assert!(report.assembly.missing.is_empty());
}

#[tokio::test]
async fn stage_reports_arrive_before_the_next_stage_starts() {
    let tmp = TempDir::new().unwrap();
    write_project(tmp.path());
    std::fs::remove_file(tmp.path().join("context.py")).unwrap();
    std::fs::remove_dir_all(tmp.path().join("data")).unwrap();
    let config = FuncpackConfig::default();
    let layout = ProjectLayout::resolve(tmp.path(), &config).unwrap();

    let mut events = Vec::new();
    pipeline(tmp.path(), config, installing_executor(layout.staging_dir.clone()))
        .run(|progress| {
            events.push(match progress {
                Progress::Started(stage) => format!("start {stage:?}"),
                Progress::Cleaned(report) => {
                    format!("cleaned {:?}", report.staging)
                }
                Progress::Assembled(report) => {
                    assert_eq!(report.missing, vec!["context.py"]);
                    assert_eq!(report.data_dir, DataDirStatus::Missing);
                    "assembled".to_owned()
                }
            });
        })
        .await
        .unwrap();

    assert_eq!(
        events,
        vec![
            "start Cleanup",
            "cleaned NotPresent",
            "start Dependencies",
            "start Assembly",
            "assembled",
            "start Packaging",
        ]
    );
}

#[tokio::test]
async fn dependency_failure_short_circuits() {
    let tmp = TempDir::new().unwrap();
    write_project(tmp.path());
    let config = FuncpackConfig::default();
    let layout = ProjectLayout::resolve(tmp.path(), &config).unwrap();

    let mut stages = Vec::new();
    let err = pipeline(tmp.path(), config, failing_executor())
        .run(|progress| {
            if let Progress::Started(stage) = progress {
                stages.push(stage);
            }
        })
        .await
        .unwrap_err();

    assert!(err.is_dependency_failure());
    assert!(matches!(err, PipelineError::DependencyStaging { .. }));
    assert_eq!(stages, vec![Stage::Cleanup, Stage::Dependencies]);
    assert!(!layout.archive.exists());
    assert!(!layout.staging_dir.join("server.py").exists());
    assert!(!layout.staging_dir.join("data").exists());
}

#[tokio::test]
async fn dependency_failure_after_stale_run_leaves_no_archive() {
    let tmp = TempDir::new().unwrap();
    write_project(tmp.path());
    let config = FuncpackConfig::default();
    let layout = ProjectLayout::resolve(tmp.path(), &config).unwrap();
    std::fs::write(&layout.archive, "PK old archive").unwrap();

    let result = pipeline(tmp.path(), config, failing_executor())
        .run(|_| {})
        .await;

    assert!(result.is_err());
    assert!(!layout.archive.exists());
}

#[tokio::test]
async fn stale_staging_content_is_not_packaged() {
    let tmp = TempDir::new().unwrap();
    write_project(tmp.path());
    let config = FuncpackConfig::default();
    let layout = ProjectLayout::resolve(tmp.path(), &config).unwrap();
    std::fs::create_dir_all(&layout.staging_dir).unwrap();
    std::fs::write(layout.staging_dir.join("sentinel.txt"), "stale").unwrap();

    let report = pipeline(tmp.path(), config, installing_executor(layout.staging_dir.clone()))
        .run(|_| {})
        .await
        .unwrap();

    assert_eq!(report.cleanup.staging, Removal::Removed);
    assert!(!archive_names(&layout.archive).contains("sentinel.txt"));
}

#[tokio::test]
async fn rerun_produces_same_entries_and_size() {
    let tmp = TempDir::new().unwrap();
    write_project(tmp.path());
    let config = FuncpackConfig::default();
    let layout = ProjectLayout::resolve(tmp.path(), &config).unwrap();

    let executor = installing_executor(layout.staging_dir.clone());
    let first = pipeline(tmp.path(), config.clone(), executor)
        .run(|_| {})
        .await
        .unwrap();
    let first_names = archive_names(&layout.archive);
    let first_bytes = std::fs::read(&layout.archive).unwrap();

    let second = pipeline(tmp.path(), config, installing_executor(layout.staging_dir.clone()))
        .run(|_| {})
        .await
        .unwrap();

    assert_eq!(second.cleanup.archive, Removal::Removed);
    assert_eq!(archive_names(&layout.archive), first_names);
    assert_eq!(second.archive.size_bytes, first.archive.size_bytes);
    assert_eq!(std::fs::read(&layout.archive).unwrap(), first_bytes);
}

#[tokio::test]
async fn missing_source_file_is_reported_not_fatal() {
    let tmp = TempDir::new().unwrap();
    write_project(tmp.path());
    std::fs::remove_file(tmp.path().join("resources.py")).unwrap();
    let config = FuncpackConfig::default();
    let layout = ProjectLayout::resolve(tmp.path(), &config).unwrap();

    let report = pipeline(tmp.path(), config, installing_executor(layout.staging_dir.clone()))
        .run(|_| {})
        .await
        .unwrap();

    assert_eq!(report.assembly.missing, vec!["resources.py"]);
    let names = archive_names(&layout.archive);
    assert!(!names.contains("resources.py"));
    assert!(names.contains("server.py"));
}

#[tokio::test]
async fn oversized_archive_is_flagged_and_kept() {
    let tmp = TempDir::new().unwrap();
    write_project(tmp.path());
    let mut config = FuncpackConfig::default();
    config.limits = LimitsConfig {
        soft_limit_bytes: 1,
        hard_limit_bytes: 2,
    };
    let layout = ProjectLayout::resolve(tmp.path(), &config).unwrap();

    let report = pipeline(tmp.path(), config, installing_executor(layout.staging_dir.clone()))
        .run(|_| {})
        .await
        .unwrap();

    assert!(report.verdict.soft_exceeded);
    assert!(report.verdict.hard_exceeded);
    assert_eq!(report.verdict.advisories().len(), 2);
    assert!(layout.archive.exists());
}

#[tokio::test]
async fn missing_manifest_aborts_before_assembly() {
    let tmp = TempDir::new().unwrap();
    write_project(tmp.path());
    std::fs::remove_file(tmp.path().join("requirements.txt")).unwrap();
    let config = FuncpackConfig::default();
    let layout = ProjectLayout::resolve(tmp.path(), &config).unwrap();

    let mut mock = MockExecutor::new();
    mock.expect_exec_streaming().times(0);

    let err = pipeline(tmp.path(), config, mock)
        .run(|_| {})
        .await
        .unwrap_err();

    assert!(err.is_dependency_failure());
    assert!(!layout.archive.exists());
    assert!(!layout.staging_dir.join("server.py").exists());
}
