use funcpack_build::{
    Advisory, AdvisoryLevel, CleanupReport, PackageReport, Pipeline, PipelineError, Progress,
    Removal,
};
use funcpack_core::FuncpackConfig;
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

/// Exit status for a dependency staging failure under `--strict`.
const EXIT_DEPENDENCY_STAGING: u8 = 2;
/// Exit status for an archive above the hard limit under `--strict`.
const EXIT_HARD_LIMIT: u8 = 3;

/// Everything `package` can end with short of an unexpected error.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome<'a> {
    Packaged {
        report: &'a PackageReport,
        advisories: Vec<Advisory>,
    },
    DependencyStagingFailed {
        error: String,
    },
}

/// Run the full packaging pipeline and report the result.
///
/// Handled failures (dependency staging, size limits, missing inputs) exit 0
/// unless `strict` is set. Anything else propagates as an error.
pub async fn package(dir: &Path, strict: bool, json: bool) -> anyhow::Result<ExitCode> {
    let (config, layout) = super::load_project(dir)?;
    let pipeline = Pipeline::new(layout, config);

    announce(json, "Creating Lambda deployment package...");
    let config = pipeline.config();
    let result = pipeline
        .run(|progress| match progress {
            Progress::Started(stage) => announce(json, &stage.to_string()),
            Progress::Cleaned(report) => {
                for warning in cleanup_warnings(report, config) {
                    announce(json, &format!("Warning: {warning}"));
                }
            }
            Progress::Assembled(report) => {
                for warning in report.warnings(config) {
                    announce(json, &format!("Warning: {warning}"));
                }
            }
        })
        .await;

    let code = match result {
        Ok(report) => {
            let advisories = report.verdict.advisories();
            let code = exit_code(Some(&report), strict);
            if json {
                print_json(&Outcome::Packaged {
                    report: &report,
                    advisories,
                })?;
            } else {
                print_report(&report, &advisories, config);
            }
            code
        }
        Err(e @ PipelineError::DependencyStaging { .. }) => {
            let error = super::error_chain(&e);
            tracing::error!(%error, "dependency staging failed");
            if json {
                print_json(&Outcome::DependencyStagingFailed { error })?;
            } else {
                println!("Error installing dependencies: {error}");
            }
            exit_code(None, strict)
        }
        Err(e) => return Err(e.into()),
    };

    Ok(ExitCode::from(code))
}

/// Progress goes to stderr in JSON mode so stdout carries only the report.
fn announce(json: bool, line: &str) {
    if json {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

/// `None` means dependency staging failed.
fn exit_code(report: Option<&PackageReport>, strict: bool) -> u8 {
    if !strict {
        return 0;
    }
    match report {
        None => EXIT_DEPENDENCY_STAGING,
        Some(r) if r.verdict.hard_exceeded => EXIT_HARD_LIMIT,
        Some(_) => 0,
    }
}

fn print_json(outcome: &Outcome<'_>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

/// One line per path that needed the escalation fallback.
fn cleanup_warnings(report: &CleanupReport, config: &FuncpackConfig) -> Vec<String> {
    [
        (&config.paths.staging_dir, &report.staging),
        (&config.paths.archive, &report.archive),
    ]
    .into_iter()
    .filter_map(|(label, removal)| match removal {
        Removal::Escalated { error } => Some(format!("Could not remove {label}: {error}")),
        _ => None,
    })
    .collect()
}

/// Summary and size advisories; stage warnings were printed as they happened.
fn print_report(report: &PackageReport, advisories: &[Advisory], config: &FuncpackConfig) {
    println!(
        "Created {} ({:.2} MB, {} files)",
        config.paths.archive,
        report.verdict.size_mib(),
        report.archive.entries
    );

    for advisory in advisories {
        let tag = match advisory.level {
            AdvisoryLevel::Warning => "WARNING",
            AdvisoryLevel::Error => "ERROR",
        };
        println!("{tag}: {}", advisory.headline);
        for detail in &advisory.details {
            println!("   {detail}");
        }
    }
}
