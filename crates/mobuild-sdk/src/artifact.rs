//! Build artifacts on disk.
//!
//! [`latest_artifact`] picks the most recently modified file matching a
//! pattern in an output directory; [`FileHandle`] carries the result and
//! derives successor file names by suffix substitution.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::types::BuildError;

/// An artifact file: absolute path plus its modification time, if known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl FileHandle {
    /// Builds a handle for `path`, reading the modification time when the
    /// file exists. The file is not required to exist.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let modified = path.metadata().and_then(|m| m.modified()).ok();
        Self { path, modified }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Replaces a trailing `suffix` of the file name with `replacement`.
    ///
    /// Returns `None` when the path does not end in `suffix`; the returned
    /// path is never equal to the input.
    pub fn with_suffix_replaced(&self, suffix: &str, replacement: &str) -> Option<PathBuf> {
        let rendered = self.path.to_str()?;
        let stem = rendered.strip_suffix(suffix)?;
        if suffix == replacement {
            return None;
        }
        Some(PathBuf::from(format!("{}{}", stem, replacement)))
    }
}

/// Returns the most recently modified file in `dir` matching `pattern`.
///
/// `pattern` is a glob applied to file names inside `dir` (for example
/// `*.apk`); directories are ignored. When several files share the newest
/// timestamp the one listed last wins.
///
/// # Errors
///
/// [`BuildError::NoArtifact`] when nothing matches, including when `dir`
/// does not exist.
pub fn latest_artifact(dir: &Path, pattern: &str) -> Result<FileHandle, BuildError> {
    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.display().to_string()),
        pattern
    );

    let entries = glob::glob(&full_pattern).map_err(|e| {
        BuildError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid artifact pattern '{}': {}", full_pattern, e),
        ))
    })?;

    let mut newest: Option<FileHandle> = None;
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let handle = FileHandle::new(&path);
        let is_newer = match &newest {
            Some(current) => handle.modified >= current.modified,
            None => true,
        };
        if is_newer {
            newest = Some(handle);
        }
    }

    match newest {
        Some(handle) => {
            tracing::debug!(artifact = %handle.path.display(), "resolved newest artifact");
            Ok(handle)
        }
        None => Err(BuildError::NoArtifact {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
        }),
    }
}
