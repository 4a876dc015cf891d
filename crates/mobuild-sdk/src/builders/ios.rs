//! iOS build automation
//!
//! [`IosBuild`] compiles a Xamarin.iOS project (optionally producing an IPA)
//! through the project builder; [`IosArchive`] asks `mdtool` to archive a
//! solution for distribution.

use std::path::PathBuf;

use super::common::{Task, TaskContext, Validated, reject_dedicated, require};
use crate::msbuild::ProjectBuild;
use crate::process::{CommandLine, QuoteStyle, run_checked};
use crate::types::{BuildError, Property};

/// Properties owned by dedicated [`IosBuildParams`] fields.
pub const IOS_DEDICATED_PROPERTIES: &[&str] = &["Configuration", "Platform", "BuildIpa"];

/// Parameters for [`IosBuild`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IosBuildParams {
    /// Project to build. Required.
    pub project_path: PathBuf,
    /// Build target (default: `Build`).
    pub target: String,
    /// Build configuration (default: `Debug`).
    pub configuration: String,
    /// Build platform (default: `iPhoneSimulator`).
    pub platform: String,
    /// Output directory; `None` lets the project decide.
    pub output_path: Option<PathBuf>,
    /// Whether to produce an IPA package.
    pub build_ipa: bool,
    /// Extra properties, passed after the dedicated ones.
    pub properties: Vec<Property>,
}

/// Builds a Xamarin.iOS project.
#[derive(Debug, Clone, Copy, Default)]
pub struct IosBuild;

impl IosBuild {
    /// The property set handed to the project builder: the dedicated
    /// properties in fixed order, then the extras.
    pub fn build_properties(params: &IosBuildParams) -> Vec<Property> {
        let mut props = vec![
            Property::new("Configuration", &params.configuration),
            Property::new("Platform", &params.platform),
            Property::new("BuildIpa", params.build_ipa.to_string()),
        ];
        props.extend(params.properties.iter().cloned());
        props
    }
}

impl Task for IosBuild {
    type Params = IosBuildParams;
    type Output = ();
    const NAME: &'static str = "ios-build";

    fn defaults(&self) -> IosBuildParams {
        IosBuildParams {
            project_path: PathBuf::new(),
            target: "Build".to_string(),
            configuration: "Debug".to_string(),
            platform: "iPhoneSimulator".to_string(),
            output_path: None,
            build_ipa: false,
            properties: Vec::new(),
        }
    }

    fn validate(&self, params: IosBuildParams) -> Result<Validated<IosBuildParams>, BuildError> {
        require(Self::NAME, "project_path", &params.project_path.to_string_lossy())?;
        reject_dedicated(Self::NAME, &params.properties, IOS_DEDICATED_PROPERTIES)?;
        Ok(Validated::new(params))
    }

    fn execute(
        &self,
        params: &Validated<IosBuildParams>,
        ctx: &TaskContext<'_>,
    ) -> Result<(), BuildError> {
        let request = ProjectBuild {
            output_path: params.output_path.clone(),
            target: params.target.clone(),
            properties: Self::build_properties(params),
            projects: vec![params.project_path.clone()],
        };
        ctx.projects.build_projects(&request)
    }
}

/// Default `mdtool` location for the host platform.
pub fn default_mdtool_path() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Applications/Xamarin Studio.app/Contents/MacOS/mdtool")
    } else if cfg!(windows) {
        PathBuf::from(r"C:\Program Files (x86)\Xamarin Studio\bin\mdtool.exe")
    } else {
        PathBuf::from("mdtool")
    }
}

/// Parameters for [`IosArchive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IosArchiveParams {
    pub solution_path: PathBuf,
    /// Project inside the solution; empty archives the solution's default.
    pub project_name: String,
    /// `Configuration|Platform` pair (default: `Debug|iPhoneSimulator`).
    pub configuration: String,
    pub mdtool_path: PathBuf,
    /// Quote character around the configuration and solution arguments.
    pub quote_style: QuoteStyle,
}

/// Archives an iOS solution with `mdtool`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IosArchive;

impl IosArchive {
    pub fn command(params: &IosArchiveParams) -> CommandLine {
        let mut cmd = CommandLine::new(params.mdtool_path.display().to_string())
            .quote_style(params.quote_style)
            .args(["-v", "archive"])
            .quoted(format!("-c:{}", params.configuration));
        if !params.project_name.is_empty() {
            cmd = cmd.arg(format!("-p:{}", params.project_name));
        }
        cmd.path(&params.solution_path)
    }
}

impl Task for IosArchive {
    type Params = IosArchiveParams;
    type Output = ();
    const NAME: &'static str = "ios-archive";

    fn defaults(&self) -> IosArchiveParams {
        IosArchiveParams {
            solution_path: PathBuf::new(),
            project_name: String::new(),
            configuration: "Debug|iPhoneSimulator".to_string(),
            mdtool_path: default_mdtool_path(),
            quote_style: QuoteStyle::Double,
        }
    }

    fn validate(&self, params: IosArchiveParams) -> Result<Validated<IosArchiveParams>, BuildError> {
        Ok(Validated::new(params))
    }

    fn execute(
        &self,
        params: &Validated<IosArchiveParams>,
        ctx: &TaskContext<'_>,
    ) -> Result<(), BuildError> {
        run_checked(ctx.process, &Self::command(params))
    }
}
