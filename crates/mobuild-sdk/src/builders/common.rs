//! The task pipeline shared by every builder.
//!
//! Each task runs as `defaults |> overrides |> validate |> execute`:
//!
//! 1. [`Task::defaults`] builds a fresh parameter record.
//! 2. The caller's override function transforms it once.
//! 3. [`Task::validate`] checks it and wraps it in [`Validated`]. Nothing
//!    outside this crate can build a `Validated`, so execution cannot be
//!    reached with unchecked parameters.
//! 4. [`Task::execute`] performs the side effects through the
//!    [`TaskContext`] boundaries.

use std::ops::Deref;

use crate::msbuild::ProjectBuilder;
use crate::process::ProcessInvoker;
use crate::types::{BuildError, Property};

/// External collaborators available to a running task.
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    pub process: &'a dyn ProcessInvoker,
    pub projects: &'a dyn ProjectBuilder,
}

impl<'a> TaskContext<'a> {
    pub fn new(process: &'a dyn ProcessInvoker, projects: &'a dyn ProjectBuilder) -> Self {
        Self { process, projects }
    }
}

/// Parameters that passed a task's validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated<P>(P);

impl<P> Validated<P> {
    pub(crate) fn new(params: P) -> Self {
        Self(params)
    }

    pub fn into_inner(self) -> P {
        self.0
    }
}

impl<P> Deref for Validated<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.0
    }
}

/// A build task: a parameter record plus its validation and execution.
///
/// Task-specific inputs (the project to restore, the APK to sign) live on
/// the implementing value; everything a caller may tune lives in
/// [`Task::Params`].
pub trait Task {
    type Params: Clone;
    type Output;

    /// Name used in errors and logs.
    const NAME: &'static str;

    /// A fresh default parameter record.
    fn defaults(&self) -> Self::Params;

    /// Checks `params`, failing on the first violation.
    fn validate(&self, params: Self::Params) -> Result<Validated<Self::Params>, BuildError>;

    /// Performs the task's external invocations.
    fn execute(
        &self,
        params: &Validated<Self::Params>,
        ctx: &TaskContext<'_>,
    ) -> Result<Self::Output, BuildError>;
}

/// Runs `task` with the caller's `overrides` applied to its defaults.
///
/// Validation completes before any process is spawned; the first error
/// from any stage is returned unchanged.
///
/// # Example
///
/// ```ignore
/// use mobuild_sdk::builders::{IosBuild, TaskContext, run_task};
///
/// run_task(&IosBuild, |p| IosBuildParams {
///     project_path: "App.iOS/App.iOS.csproj".into(),
///     build_ipa: true,
///     ..p
/// }, &ctx)?;
/// ```
pub fn run_task<T, F>(task: &T, overrides: F, ctx: &TaskContext<'_>) -> Result<T::Output, BuildError>
where
    T: Task,
    F: FnOnce(T::Params) -> T::Params,
{
    let params = overrides(task.defaults());
    let validated = task.validate(params)?;
    tracing::info!(task = T::NAME, "starting");
    let output = task.execute(&validated, ctx)?;
    tracing::info!(task = T::NAME, "finished");
    Ok(output)
}

/// Fails with [`BuildError::MissingField`] when `value` is empty.
pub(crate) fn require(
    task: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), BuildError> {
    if value.is_empty() {
        return Err(BuildError::MissingField { task, field });
    }
    Ok(())
}

/// Fails with [`BuildError::PropertyCollision`] when an extra property
/// shares a name (ignoring ASCII case) with a dedicated property.
pub(crate) fn reject_dedicated(
    task: &'static str,
    extras: &[Property],
    dedicated: &[&'static str],
) -> Result<(), BuildError> {
    for prop in extras {
        if let Some(field) = dedicated
            .iter()
            .find(|name| name.eq_ignore_ascii_case(&prop.name))
        {
            return Err(BuildError::PropertyCollision {
                task,
                property: prop.name.clone(),
                field: *field,
            });
        }
    }
    Ok(())
}
