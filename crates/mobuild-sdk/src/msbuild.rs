//! The project-build boundary.
//!
//! iOS build and Android package tasks do not run a compiler themselves;
//! they describe a build as a [`ProjectBuild`] and hand it to a
//! [`ProjectBuilder`]. [`MsBuild`] is the adapter that turns the request
//! into `msbuild`/`xbuild` invocations.

use std::path::{Path, PathBuf};

use crate::process::{CommandLine, ProcessInvoker, QuoteStyle, run_checked};
use crate::types::{BuildError, Property};

/// One request to the external project-build invoker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBuild {
    /// Output directory override; `None` leaves it to the project.
    pub output_path: Option<PathBuf>,
    /// Build target, e.g. `Build` or `PackageForAndroid`.
    pub target: String,
    /// Properties in the order they are passed.
    pub properties: Vec<Property>,
    /// One or more project or solution files.
    pub projects: Vec<PathBuf>,
}

/// Builds projects through an external MSBuild-style tool.
pub trait ProjectBuilder {
    fn build_projects(&self, request: &ProjectBuild) -> Result<(), BuildError>;
}

/// Tool names tried, in order, when no explicit build tool is configured.
pub const MSBUILD_CANDIDATES: &[&str] = &["msbuild", "xbuild"];

/// [`ProjectBuilder`] that runs `msbuild` (or `xbuild`) once per project.
pub struct MsBuild<'a> {
    tool: String,
    invoker: &'a dyn ProcessInvoker,
    quote_style: QuoteStyle,
}

impl<'a> MsBuild<'a> {
    pub fn new(tool: impl Into<String>, invoker: &'a dyn ProcessInvoker) -> Self {
        Self {
            tool: tool.into(),
            invoker,
            quote_style: QuoteStyle::host(),
        }
    }

    /// Sets the quote character used for project paths and property values.
    pub fn quote_style(mut self, style: QuoteStyle) -> Self {
        self.quote_style = style;
        self
    }

    /// Resolves the build tool: an explicit path wins, otherwise the first
    /// of [`MSBUILD_CANDIDATES`] found on `PATH`.
    pub fn locate(
        explicit: Option<&Path>,
        invoker: &'a dyn ProcessInvoker,
    ) -> Result<Self, BuildError> {
        if let Some(path) = explicit {
            return Ok(Self::new(path.display().to_string(), invoker));
        }

        MSBUILD_CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(|path| Self::new(path.display().to_string(), invoker))
            .ok_or_else(|| BuildError::ToolNotFound {
                tool: "msbuild".to_string(),
                searched: MSBUILD_CANDIDATES
                    .iter()
                    .map(|name| format!("{} on PATH", name))
                    .collect(),
            })
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Renders the command line for a single project.
    pub fn command_for(&self, request: &ProjectBuild, project: &Path) -> CommandLine {
        let mut cmd = CommandLine::new(&self.tool)
            .quote_style(self.quote_style)
            .arg("/nologo")
            .arg(format!("/t:{}", request.target));

        if let Some(out) = &request.output_path {
            cmd = cmd.arg(self.property_arg("OutputPath", &out.display().to_string()));
        }
        for prop in &request.properties {
            cmd = cmd.arg(self.property_arg(&prop.name, &prop.value));
        }
        cmd.path(project)
    }

    fn property_arg(&self, name: &str, value: &str) -> String {
        let needs_quotes = value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == ';');
        if needs_quotes {
            format!("/p:{}={}", name, self.quote_style.quote(value))
        } else {
            format!("/p:{}={}", name, value)
        }
    }
}

impl ProjectBuilder for MsBuild<'_> {
    fn build_projects(&self, request: &ProjectBuild) -> Result<(), BuildError> {
        for project in &request.projects {
            tracing::info!(
                project = %project.display(),
                target = %request.target,
                "building project"
            );
            run_checked(self.invoker, &self.command_for(request, project))?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::RecordingInvoker;

    fn request(projects: &[&str]) -> ProjectBuild {
        ProjectBuild {
            output_path: Some(PathBuf::from("bin/Release")),
            target: "PackageForAndroid".to_string(),
            properties: vec![
                Property::new("Configuration", "Release"),
                Property::new("DefineConstants", "A;B"),
            ],
            projects: projects.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn test_command_line_shape() {
        let invoker = RecordingInvoker::succeeding();
        let msbuild = MsBuild::new("msbuild", &invoker).quote_style(QuoteStyle::Double);
        let cmd = msbuild.command_for(&request(&["App.csproj"]), Path::new("App.csproj"));
        assert_eq!(
            cmd.render_args(),
            "/nologo /t:PackageForAndroid /p:OutputPath=bin/Release \
             /p:Configuration=Release /p:DefineConstants=\"A;B\" \"App.csproj\""
        );
    }

    #[test]
    fn test_output_path_omitted_when_unset() {
        let invoker = RecordingInvoker::succeeding();
        let msbuild = MsBuild::new("xbuild", &invoker).quote_style(QuoteStyle::Single);
        let mut req = request(&["App.csproj"]);
        req.output_path = None;
        req.properties.clear();
        let cmd = msbuild.command_for(&req, Path::new("App.csproj"));
        assert_eq!(cmd.render_args(), "/nologo /t:PackageForAndroid 'App.csproj'");
    }

    #[test]
    fn test_builds_each_project() {
        let invoker = RecordingInvoker::succeeding();
        let msbuild = MsBuild::new("msbuild", &invoker);
        msbuild
            .build_projects(&request(&["A.csproj", "B.csproj"]))
            .unwrap();
        let calls = invoker.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1.ends_with("A.csproj'") || calls[0].1.ends_with("A.csproj\""));
        assert!(calls[1].1.contains("B.csproj"));
    }

    #[test]
    fn test_stops_at_first_failing_project() {
        let invoker = RecordingInvoker::failing(1);
        let msbuild = MsBuild::new("msbuild", &invoker);
        let err = msbuild
            .build_projects(&request(&["A.csproj", "B.csproj"]))
            .unwrap_err();
        assert!(matches!(err, BuildError::Process { status: 1, .. }));
        assert_eq!(invoker.calls().len(), 1);
    }

    #[test]
    fn test_locate_prefers_explicit_tool() {
        let invoker = RecordingInvoker::succeeding();
        let msbuild = MsBuild::locate(Some(Path::new("/opt/mono/bin/xbuild")), &invoker).unwrap();
        assert_eq!(msbuild.tool(), "/opt/mono/bin/xbuild");
    }
}
