//! Core types for mobuild-sdk.
//!
//! - [`BuildError`] - Error type shared by every task
//! - [`Property`] - One entry of a task's extra property list

use std::path::PathBuf;

/// Error types for mobuild-sdk operations.
///
/// Variants fall into three families:
///
/// - configuration errors, raised by validation before any process runs
///   ([`MissingField`](BuildError::MissingField),
///   [`PropertyCollision`](BuildError::PropertyCollision),
///   [`UnexpectedArtifact`](BuildError::UnexpectedArtifact),
///   [`ToolNotFound`](BuildError::ToolNotFound));
/// - external process failures ([`Spawn`](BuildError::Spawn),
///   [`Process`](BuildError::Process));
/// - artifact discovery failures ([`NoArtifact`](BuildError::NoArtifact),
///   [`Io`](BuildError::Io)).
///
/// # Example
///
/// ```ignore
/// use mobuild_sdk::{BuildError, builders::IosBuild, run_task};
///
/// match run_task(&IosBuild, |p| p, &ctx) {
///     Err(BuildError::MissingField { field, .. }) => eprintln!("set {}", field),
///     Err(BuildError::Process { program, status }) => {
///         eprintln!("{} exited with {}", program, status)
///     }
///     other => other?,
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A required parameter was left empty.
    #[error("{task}: required parameter `{field}` is empty")]
    MissingField {
        /// Task that rejected its parameters.
        task: &'static str,
        /// Name of the empty field.
        field: &'static str,
    },

    /// An extra property duplicates a property owned by a dedicated field.
    ///
    /// `property` is the name as the caller wrote it, `field` the canonical
    /// name of the dedicated property it collides with.
    #[error(
        "{task}: extra property `{property}` collides with `{field}`; set the dedicated field instead"
    )]
    PropertyCollision {
        task: &'static str,
        property: String,
        field: &'static str,
    },

    /// The input artifact does not have the shape the task expects.
    #[error("unexpected artifact {path:?}: expected a file ending in `{expected}`")]
    UnexpectedArtifact {
        path: PathBuf,
        expected: &'static str,
    },

    /// No executable could be found for a tool.
    #[error("{tool} not found. Searched:\n{}", format_searched(.searched))]
    ToolNotFound {
        tool: String,
        searched: Vec<String>,
    },

    /// The program could not be started at all.
    #[error("failed to start {program}: {source}. Ensure the tool is installed and on PATH")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited with a non-zero status.
    #[error("{program} exited with status {status}")]
    Process { program: String, status: i32 },

    /// Artifact discovery found no matching file.
    #[error("no artifact matching `{pattern}` was produced in {dir:?}")]
    NoArtifact { dir: PathBuf, pattern: String },

    /// An I/O error occurred while inspecting build outputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_searched(searched: &[String]) -> String {
    searched
        .iter()
        .map(|s| format!("  - {}", s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// An additional build-system property forwarded to the project invoker.
///
/// Extra properties are appended, in order, after the properties a task
/// derives from its dedicated fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for Property {
    fn from((name, value): (N, V)) -> Self {
        Property::new(name, value)
    }
}
