//! Error types for the cw-compiler crate.
//!
//! This module provides the [`CompilerError`] type for failures reported by,
//! or while reaching, the external CoffeeScript compiler.

/// Errors that can occur while compiling a source.
///
/// # Error Recovery Strategy
///
/// - **Syntax errors** ([`CompilerError::Syntax`]): Recoverable - record against
///   the file and continue with the batch
/// - **Unavailable** ([`CompilerError::Unavailable`]): Fatal - no file in the run
///   can be compiled
/// - **I/O errors** ([`CompilerError::Io`]): Recoverable - the process could be
///   launched before, so only this file is affected
/// - **Invalid source maps** ([`CompilerError::InvalidSourceMap`]): Recoverable
///
/// # Examples
///
/// ```
/// use cw_compiler::CompilerError;
///
/// let err = CompilerError::syntax("[stdin]:2:1: error: unexpected indentation");
/// assert!(!err.is_fatal());
/// assert_eq!(err.to_string(), "[stdin]:2:1: error: unexpected indentation");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    /// The compiler rejected the source.
    ///
    /// The message is the compiler's own text, unmodified.
    #[error("{message}")]
    Syntax {
        /// Diagnostic text from the compiler.
        message: String,
    },

    /// The compiler could not be located or launched.
    #[error("CoffeeScript compiler unavailable: {reason}")]
    Unavailable {
        /// Why the compiler could not be reached.
        reason: String,
    },

    /// Communicating with the compiler process failed.
    #[error("failed to run the CoffeeScript compiler: {0}")]
    Io(#[from] std::io::Error),

    /// The compiler produced a source map that is not valid JSON.
    #[error("invalid source map from compiler: {0}")]
    InvalidSourceMap(#[from] serde_json::Error),
}

impl CompilerError {
    /// Creates a new [`CompilerError::Syntax`] error.
    #[inline]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    /// Creates a new [`CompilerError::Unavailable`] error.
    #[inline]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns `true` if no further file in the run can be compiled.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_is_verbatim() {
        let err = CompilerError::syntax("Parse error on line 2: Unexpected 'UNARY'");
        assert_eq!(err.to_string(), "Parse error on line 2: Unexpected 'UNARY'");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unavailable_is_fatal() {
        let err = CompilerError::unavailable("could not find `coffee` in PATH");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("`coffee`"));
    }

    #[test]
    fn test_io_is_not_fatal() {
        let err = CompilerError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe closed",
        ));
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("pipe closed"));
    }
}
