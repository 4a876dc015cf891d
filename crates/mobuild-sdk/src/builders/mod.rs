//! Build tasks for mobile platforms.
//!
//! Every task follows the same pipeline (see [`run_task`]): a fresh default
//! parameter record, one caller override, validation, then execution.
//!
//! ## Tasks
//!
//! | Task | Parameters | External tool | Output |
//! |------|------------|---------------|--------|
//! | [`RestoreComponents`] | [`RestoreParams`] | `xamarin-component` | none |
//! | [`IosBuild`] | [`IosBuildParams`] | project builder | none |
//! | [`AndroidPackage`] | [`AndroidPackageParams`] | project builder | newest `*.apk` |
//! | [`SignAndAlign`] | [`SignAndAlignParams`] | `jarsigner`, `zipalign` | `*-SignedAndAligned.apk` |
//! | [`IosArchive`] | [`IosArchiveParams`] | `mdtool` | none |
//!
//! ## Example
//!
//! ```ignore
//! use mobuild_sdk::builders::{AndroidPackage, AndroidPackageParams, SignAndAlign, SignAndAlignParams, TaskContext, run_task};
//! use mobuild_sdk::{MsBuild, SystemInvoker};
//!
//! let process = SystemInvoker;
//! let msbuild = MsBuild::locate(None, &process)?;
//! let ctx = TaskContext::new(&process, &msbuild);
//!
//! let apk = run_task(&AndroidPackage, |p| AndroidPackageParams {
//!     project_path: "App.Droid/App.Droid.csproj".into(),
//!     ..p
//! }, &ctx)?;
//!
//! let release = run_task(&SignAndAlign::new(apk), |p| SignAndAlignParams {
//!     keystore_path: "release.keystore".into(),
//!     keystore_password: std::env::var("KEYSTORE_PASSWORD")?,
//!     keystore_alias: "release".into(),
//!     ..p
//! }, &ctx)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod android;
pub mod common;
pub mod ios;
pub mod restore;

pub use android::{AndroidPackage, AndroidPackageParams, SignAndAlign, SignAndAlignParams};
pub use common::{Task, TaskContext, Validated, run_task};
pub use ios::{IosArchive, IosArchiveParams, IosBuild, IosBuildParams, default_mdtool_path};
pub use restore::{RestoreComponents, RestoreParams};
