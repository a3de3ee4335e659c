//! Staging, assembly, and zip packaging for funcpack.
//!
//! # Pipeline
//!
//! ```text
//! funcpack package
//!   1. Cleanup      ── remove <staging>/ and <archive> from the last run
//!   2. Dependencies ── docker run <lambda image> pip install --target <staging>
//!   3. Assembly     ── copy source files + data/ into <staging>/
//!   4. Packaging    ── zip <staging>/ → <archive>, classify size
//! ```
//!
//! A dependency staging failure stops the run before assembly, so no
//! archive is written. Size limits are advisory: an oversized archive is
//! reported and kept.
//!
//! # Archive layout
//!
//! Entry names are relative to the staging directory (`boto3/__init__.py`,
//! `server.py`, `data/prompts.json`), sorted by file name, with a fixed
//! 1980-01-01 timestamp so rebuilding unchanged inputs yields identical bytes.

pub mod archive;
pub mod assemble;
pub mod cleanup;
pub mod pipeline;
pub mod size;

pub use archive::{ArchiveError, ArchiveSummary, write_archive};
pub use assemble::{AssembleError, AssemblyReport, DataDirStatus, assemble, copy_tree};
pub use cleanup::{CleanupReport, Removal, clean, remove_path};
pub use pipeline::{PackageReport, Pipeline, PipelineError, Progress, Stage};
pub use size::{Advisory, AdvisoryLevel, SizeVerdict, mib};
