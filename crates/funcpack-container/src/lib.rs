//! Container runtime access for funcpack.
//!
//! Dependencies are installed inside the pinned Lambda build image so the
//! staged wheels match the deployment target's runtime and CPU architecture,
//! whatever the host machine is.

pub mod client;
pub mod executor;
pub mod runtime;

pub use client::{CheckResult, ContainerClient, DoctorReport, InstallError};
pub use executor::{ContainerExecutor, RealExecutor};
pub use runtime::ContainerError;
