//! Build tasks for Xamarin mobile apps.
//!
//! `mobuild-sdk` drives the external toolchain that turns Xamarin projects
//! into iOS and Android artifacts: component restore, MSBuild-style builds,
//! APK packaging, `jarsigner` + `zipalign`, and `mdtool` archiving.
//!
//! # Architecture
//!
//! - **Process boundary** ([`process`]): every tool runs through a
//!   [`ProcessInvoker`]; a non-zero exit status is always an error
//! - **Project builder** ([`msbuild`]): iOS build and Android package
//!   delegate to a [`ProjectBuilder`], normally [`MsBuild`]
//! - **Artifacts** ([`artifact`]): newest-file discovery and derived names
//! - **Tasks** ([`builders`]): parameter records, validation and execution,
//!   composed by [`run_task`](builders::run_task)
//!
//! Tasks are independent and synchronous. Nothing is retried and nothing is
//! cleaned up after a failure.

pub mod artifact;
pub mod builders;
pub mod msbuild;
pub mod process;
pub mod types;

pub use artifact::{FileHandle, latest_artifact};
pub use builders::{Task, TaskContext, run_task};
pub use msbuild::{MsBuild, ProjectBuild, ProjectBuilder};
pub use process::{CommandLine, ProcessInvoker, QuoteStyle, SystemInvoker};
pub use types::{BuildError, Property};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
