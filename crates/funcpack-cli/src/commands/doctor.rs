use funcpack_container::{CheckResult, ContainerClient};
use funcpack_core::{CONFIG_FILE_NAME, FuncpackConfig};
use std::path::Path;

pub async fn doctor(dir: &Path) -> anyhow::Result<()> {
    let (config, config_check) = match FuncpackConfig::load(dir) {
        Ok(config) if dir.join(CONFIG_FILE_NAME).exists() => {
            (config, CheckResult::ok(CONFIG_FILE_NAME))
        }
        Ok(config) => (config, CheckResult::ok("Not found; using defaults")),
        Err(e) => {
            // Keep checking the rest with defaults so the report stays complete.
            let detail = super::error_chain(&e);
            (FuncpackConfig::default(), CheckResult::fail(&detail))
        }
    };

    let client = ContainerClient::new(&config.container);
    let mut report = client.doctor().await;
    report.config_file = config_check;

    let manifest = dir.join(&config.paths.manifest);
    report.manifest = if manifest.is_file() {
        CheckResult::ok(&config.paths.manifest)
    } else {
        CheckResult::fail(&format!("{} not found", config.paths.manifest))
    };

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed; see above for details");
    }

    Ok(())
}
