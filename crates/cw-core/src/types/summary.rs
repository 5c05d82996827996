//! Run result types.
//!
//! A run produces a [`RunSummary`]: the ordered list of artifacts it wrote (or
//! would have written, in noop mode) and the ordered list of per-file errors.
//! The summary is the only value handed back to the host.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// An error attributed to one source file.
///
/// The display form is `"<source>: <message>"`, which keeps multi-file
/// batches diagnosable once messages are concatenated.
///
/// # Examples
///
/// ```
/// use cw_core::FileError;
///
/// let err = FileError::new("a.coffee", "Parse error on line 2: Unexpected 'UNARY'");
/// assert_eq!(err.to_string(), "a.coffee: Parse error on line 2: Unexpected 'UNARY'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    /// The source file the error belongs to.
    ///
    /// Empty for run-wide errors (e.g. a missing compiler).
    pub source_path: Utf8PathBuf,

    /// The error text, verbatim from its origin.
    pub message: String,
}

impl FileError {
    /// Creates an error for `source_path`.
    #[must_use]
    pub fn new(source_path: impl Into<Utf8PathBuf>, message: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            message: message.into(),
        }
    }

    /// Creates an error that belongs to the run as a whole.
    #[must_use]
    pub fn run_wide(message: impl Into<String>) -> Self {
        Self::new(Utf8PathBuf::new(), message)
    }

    /// Returns `true` if this error is not attributed to a file.
    #[must_use]
    pub fn is_run_wide(&self) -> bool {
        self.source_path.as_str().is_empty()
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_run_wide() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.source_path, self.message)
        }
    }
}

/// Aggregate outcome of one compile run.
///
/// # Examples
///
/// ```
/// use cw_core::{FileError, RunSummary};
///
/// let mut summary = RunSummary::default();
/// summary.push_artifact("javascripts/a.js");
/// assert!(summary.is_success());
///
/// summary.push_error(FileError::new("b.coffee", "unexpected end of input"));
/// assert!(!summary.is_success());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Output paths written during the run, in processing order.
    ///
    /// Source map sidecars follow their primary artifact.
    pub changed_artifacts: Vec<Utf8PathBuf>,

    /// Per-file errors, in processing order.
    pub errors: Vec<FileError>,
}

impl RunSummary {
    /// Returns `true` when the run recorded no errors.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a changed artifact.
    pub fn push_artifact(&mut self, path: impl Into<Utf8PathBuf>) {
        self.changed_artifacts.push(path.into());
    }

    /// Records several changed artifacts, preserving their order.
    pub fn extend_artifacts<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.changed_artifacts
            .extend(paths.into_iter().map(Into::into));
    }

    /// Records an error.
    pub fn push_error(&mut self, error: FileError) {
        self.errors.push(error);
    }

    /// Returns the error messages joined by newlines.
    #[must_use]
    pub fn error_text(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns the changed artifacts joined by `", "`.
    #[must_use]
    pub fn artifact_list(&self) -> String {
        join_paths(&self.changed_artifacts)
    }
}

/// Joins paths with `", "` for human-facing messages.
#[must_use]
pub fn join_paths<P: AsRef<Utf8Path>>(paths: &[P]) -> String {
    paths
        .iter()
        .map(|p| p.as_ref().as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_display() {
        let err = FileError::new("src/a.coffee", "missing }");
        assert_eq!(err.to_string(), "src/a.coffee: missing }");
        assert!(!err.is_run_wide());
    }

    #[test]
    fn test_run_wide_error_display() {
        let err = FileError::run_wide("coffee not found");
        assert!(err.is_run_wide());
        assert_eq!(err.to_string(), "coffee not found");
    }

    #[test]
    fn test_summary_success_tracks_errors() {
        let mut summary = RunSummary::default();
        assert!(summary.is_success());

        summary.extend_artifacts(["a.js", "a.js.map"]);
        assert!(summary.is_success());
        assert_eq!(summary.artifact_list(), "a.js, a.js.map");

        summary.push_error(FileError::new("b.coffee", "oops"));
        assert!(!summary.is_success());
    }

    #[test]
    fn test_error_text_joins_lines() {
        let mut summary = RunSummary::default();
        summary.push_error(FileError::new("a.coffee", "one"));
        summary.push_error(FileError::new("b.coffee", "two"));
        assert_eq!(summary.error_text(), "a.coffee: one\nb.coffee: two");
    }

    #[test]
    fn test_join_paths_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(join_paths(&empty), "");
    }

    #[test]
    fn test_summary_json_shape() {
        let mut summary = RunSummary::default();
        summary.push_artifact("javascripts/a.js");
        summary.push_error(FileError::new("b.coffee", "oops"));

        insta::assert_json_snapshot!(summary, @r#"
        {
          "changed_artifacts": [
            "javascripts/a.js"
          ],
          "errors": [
            {
              "source_path": "b.coffee",
              "message": "oops"
            }
          ]
        }
        "#);
    }
}
