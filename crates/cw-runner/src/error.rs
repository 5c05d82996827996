//! Error types for the cw-runner crate.
//!
//! This module provides the [`RunnerError`] type for failures while routing,
//! compiling, writing or removing artifacts.

use camino::{Utf8Path, Utf8PathBuf};
use cw_compiler::CompilerError;

/// Errors that can occur during a run.
///
/// # Error Recovery Strategy
///
/// - **Read errors** ([`RunnerError::Read`]): Recoverable - record against the
///   file, continue with the batch
/// - **Compile errors** ([`RunnerError::Compile`]): Recoverable, unless the
///   compiler itself is unavailable
/// - **Write/remove errors** ([`RunnerError::Write`], [`RunnerError::Remove`]):
///   Recoverable - the artifact is missing, other files are unaffected
/// - **Pattern and walk errors**: Fatal - the run cannot start
///
/// # Examples
///
/// ```
/// use cw_runner::RunnerError;
/// use std::io;
///
/// let err = RunnerError::write("javascripts/a.js", io::Error::other("disk full"));
/// assert!(err.is_recoverable());
/// assert_eq!(err.path().map(|p| p.as_str()), Some("javascripts/a.js"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to read a source file.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The source that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The compiler failed on a source file.
    #[error("failed to compile {path}: {source}")]
    Compile {
        /// The source being compiled.
        path: Utf8PathBuf,
        /// The compiler's error.
        #[source]
        source: CompilerError,
    },

    /// Failed to create a directory or write an artifact.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The directory or artifact being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to delete an artifact.
    #[error("failed to remove {path}: {source}")]
    Remove {
        /// The artifact being removed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A watch pattern is not a valid regular expression.
    #[error("invalid watch pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as configured.
        pattern: String,
        /// The regex compile error.
        #[source]
        source: regex::Error,
    },

    /// Failed to walk the working root.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// A discovered path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

impl RunnerError {
    /// Creates a new [`RunnerError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`RunnerError::Compile`] error.
    #[inline]
    pub fn compile(path: impl Into<Utf8PathBuf>, source: CompilerError) -> Self {
        Self::Compile {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`RunnerError::Write`] error.
    #[inline]
    pub fn write(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`RunnerError::Remove`] error.
    #[inline]
    pub fn remove(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Remove {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`RunnerError::InvalidPattern`] error.
    #[inline]
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    /// Returns `true` if the batch can continue past this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Read { .. } | Self::Write { .. } | Self::Remove { .. } => true,
            Self::Compile { source, .. } => !source.is_fatal(),
            Self::InvalidPattern { .. } | Self::Walk(_) | Self::NonUtf8Path(_) => false,
        }
    }

    /// Returns `true` if the run should stop.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Read { path, .. }
            | Self::Compile { path, .. }
            | Self::Write { path, .. }
            | Self::Remove { path, .. } => Some(path),
            Self::InvalidPattern { .. } | Self::Walk(_) | Self::NonUtf8Path(_) => None,
        }
    }

    /// Returns the message recorded against the source file.
    ///
    /// The source path is left out since the run summary prefixes it. Compiler
    /// diagnostics are passed through verbatim.
    #[must_use]
    pub fn file_message(&self) -> String {
        match self {
            Self::Read { source, .. } => format!("failed to read source: {source}"),
            Self::Compile { source, .. } => source.to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_read_error() {
        let err = RunnerError::read("a.coffee", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_recoverable());
        assert_eq!(err.path().map(Utf8Path::as_str), Some("a.coffee"));
        assert_eq!(err.file_message(), "failed to read source: gone");
    }

    #[test]
    fn test_compile_error_message_is_verbatim() {
        let err = RunnerError::compile(
            "a.coffee",
            CompilerError::syntax("[stdin]:1:5: error: unexpected ->"),
        );
        assert!(err.is_recoverable());
        assert_eq!(err.file_message(), "[stdin]:1:5: error: unexpected ->");
        assert!(err.to_string().starts_with("failed to compile a.coffee"));
    }

    #[test]
    fn test_unavailable_compiler_is_fatal() {
        let err = RunnerError::compile("a.coffee", CompilerError::unavailable("not installed"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_write_error_keeps_artifact_path() {
        let err = RunnerError::write("out/a.js", io::Error::other("read-only"));
        assert!(err.is_recoverable());
        assert_eq!(err.file_message(), "failed to write out/a.js: read-only");
    }

    #[test]
    fn test_invalid_pattern_is_fatal() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = RunnerError::invalid_pattern("(", source);
        assert!(err.is_fatal());
        assert!(err.path().is_none());
        assert!(err.to_string().contains("'('"));
    }
}
