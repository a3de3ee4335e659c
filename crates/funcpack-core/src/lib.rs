//! Core types and configuration for funcpack.
//!
//! This crate defines the `funcpack.toml` schema ([`FuncpackConfig`]),
//! project path resolution ([`ProjectLayout`]), and shared error types.

pub mod config;
pub mod error;
pub mod project;

pub use config::{
    AssemblyConfig, CONFIG_FILE_NAME, CleanupConfig, ContainerConfig, FuncpackConfig,
    InstallerConfig, LimitsConfig, MIB, PathsConfig,
};
pub use error::{Error, Result};
pub use project::ProjectLayout;
