use funcpack_build::cleanup::{self, Removal};
use std::path::Path;

/// Run only the cleanup stage.
pub fn clean(dir: &Path) -> anyhow::Result<()> {
    let (config, layout) = super::load_project(dir)?;

    println!("Cleaning up old artifacts...");
    let report = cleanup::clean(&layout, &config.cleanup);

    for (label, removal) in [
        (config.paths.staging_dir.as_str(), &report.staging),
        (config.paths.archive.as_str(), &report.archive),
    ] {
        match removal {
            Removal::NotPresent => println!("  {label}: nothing to remove"),
            Removal::Removed => println!("  {label}: removed"),
            Removal::RemovedAfterPermissionFix => {
                println!("  {label}: removed (after restoring write permission)");
            }
            Removal::Escalated { error } => {
                println!("  Warning: could not remove {label}: {error}");
                println!("  Escalation command was run; check that {label} is gone");
            }
        }
    }

    Ok(())
}
