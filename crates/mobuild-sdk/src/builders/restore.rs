//! Xamarin component restore.
//!
//! Runs `xamarin-component restore <project>` to fetch the components a
//! project references before it is built.

use std::path::{Path, PathBuf};

use super::common::{Task, TaskContext, Validated, require};
use crate::artifact::latest_artifact;
use crate::process::{CommandLine, run_checked};
use crate::types::BuildError;

/// Executable name looked up on `PATH`.
pub const COMPONENT_TOOL: &str = "xamarin-component";
/// File name searched for under [`COMPONENT_SEARCH_DIR`].
pub const COMPONENT_TOOL_FILE: &str = "xamarin-component.exe";
/// Directory, relative to the working directory, searched for the tool.
pub const COMPONENT_SEARCH_DIR: &str = "tools/xpkg";

/// Parameters for [`RestoreComponents`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreParams {
    /// Explicit tool location. When `None` the tool is searched for under
    /// `tools/xpkg/` and then on `PATH`.
    pub tool_path: Option<PathBuf>,
}

/// Restores the Xamarin components of one project.
#[derive(Debug, Clone)]
pub struct RestoreComponents {
    project: PathBuf,
    search_root: PathBuf,
}

impl RestoreComponents {
    pub fn new(project: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            search_root: PathBuf::from("."),
        }
    }

    /// Directory the `tools/xpkg` search starts from (default: `.`).
    pub fn search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_root = root.into();
        self
    }

    fn resolve_tool(&self, explicit: Option<&Path>) -> Result<PathBuf, BuildError> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            return which::which(path).map_err(|_| BuildError::ToolNotFound {
                tool: path.display().to_string(),
                searched: vec![
                    format!("{} (as given)", path.display()),
                    "PATH".to_string(),
                ],
            });
        }

        let search_dir = self.search_root.join(COMPONENT_SEARCH_DIR);
        if let Some(found) = find_in_subdirs(&search_dir, COMPONENT_TOOL_FILE) {
            return Ok(found);
        }

        which::which(COMPONENT_TOOL).map_err(|_| BuildError::ToolNotFound {
            tool: COMPONENT_TOOL.to_string(),
            searched: vec![
                format!("{}/**/{}", search_dir.display(), COMPONENT_TOOL_FILE),
                format!("{} on PATH", COMPONENT_TOOL),
            ],
        })
    }
}

/// Newest `file_name` in `dir` or any directory below it.
fn find_in_subdirs(dir: &Path, file_name: &str) -> Option<PathBuf> {
    latest_artifact(dir, &format!("**/{}", file_name))
        .ok()
        .map(|handle| handle.path().to_path_buf())
}

impl Task for RestoreComponents {
    type Params = RestoreParams;
    type Output = ();
    const NAME: &'static str = "component-restore";

    fn defaults(&self) -> RestoreParams {
        RestoreParams::default()
    }

    fn validate(&self, params: RestoreParams) -> Result<Validated<RestoreParams>, BuildError> {
        require(Self::NAME, "project", &self.project.to_string_lossy())?;
        let tool = self.resolve_tool(params.tool_path.as_deref())?;
        Ok(Validated::new(RestoreParams {
            tool_path: Some(tool),
        }))
    }

    fn execute(
        &self,
        params: &Validated<RestoreParams>,
        ctx: &TaskContext<'_>,
    ) -> Result<(), BuildError> {
        // Validation always resolves the tool.
        let Some(tool) = params.tool_path.as_deref() else {
            return Err(BuildError::MissingField {
                task: Self::NAME,
                field: "tool_path",
            });
        };
        let cmd = CommandLine::new(tool.display().to_string())
            .arg("restore")
            .path(&self.project);
        run_checked(ctx.process, &cmd)
    }
}
