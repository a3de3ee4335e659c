mod clean;
mod doctor;
mod package;

use funcpack_core::{FuncpackConfig, ProjectLayout};
use std::path::Path;

pub use clean::clean;
pub use doctor::doctor;
pub use package::package;

/// Load `funcpack.toml` (or defaults) and resolve paths for `dir`.
pub(crate) fn load_project(dir: &Path) -> anyhow::Result<(FuncpackConfig, ProjectLayout)> {
    let config = FuncpackConfig::load(dir)?;
    let layout = ProjectLayout::resolve(dir, &config)?;
    Ok((config, layout))
}

/// `error: cause: cause ...` on one line.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
