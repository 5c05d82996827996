//! The compiler capability the runner drives.

use crate::error::CompilerError;
use crate::options::CompileOptions;

/// Output of a successful compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
    /// Generated JavaScript, without any source-mapping comment.
    pub js: String,

    /// Version 3 source map as JSON, when one was requested.
    pub source_map: Option<String>,
}

impl CompileOutput {
    /// Creates output without a source map.
    #[must_use]
    pub fn js(js: impl Into<String>) -> Self {
        Self {
            js: js.into(),
            source_map: None,
        }
    }
}

/// A CoffeeScript compiler.
///
/// Implementations turn source text into JavaScript. The runner treats the
/// compiler as opaque: it only distinguishes rejected sources
/// ([`CompilerError::Syntax`]) from a compiler that cannot run at all
/// ([`CompilerError::Unavailable`]).
///
/// # Examples
///
/// ```
/// use cw_compiler::{CompileOptions, CompileOutput, Compiler, CompilerError};
///
/// /// Emits the source unchanged.
/// struct Passthrough;
///
/// impl Compiler for Passthrough {
///     fn compile(&self, source: &str, _options: &CompileOptions) -> Result<CompileOutput, CompilerError> {
///         Ok(CompileOutput::js(source))
///     }
/// }
///
/// let out = Passthrough.compile("x = 1", &CompileOptions::default()).unwrap();
/// assert_eq!(out.js, "x = 1");
/// ```
pub trait Compiler {
    /// Checks that the compiler can be invoked.
    ///
    /// Called once at the start of every run so an unavailable compiler is
    /// reported once instead of once per file.
    fn ensure_available(&self) -> Result<(), CompilerError> {
        Ok(())
    }

    /// Compiles `source` with the given per-file options.
    fn compile(&self, source: &str, options: &CompileOptions)
    -> Result<CompileOutput, CompilerError>;
}

impl<C: Compiler + ?Sized> Compiler for Box<C> {
    fn ensure_available(&self) -> Result<(), CompilerError> {
        (**self).ensure_available()
    }

    fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilerError> {
        (**self).compile(source, options)
    }
}

impl<C: Compiler + ?Sized> Compiler for &C {
    fn ensure_available(&self) -> Result<(), CompilerError> {
        (**self).ensure_available()
    }

    fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilerError> {
        (**self).compile(source, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Compiler for Upper {
        fn compile(
            &self,
            source: &str,
            _options: &CompileOptions,
        ) -> Result<CompileOutput, CompilerError> {
            Ok(CompileOutput::js(source.to_uppercase()))
        }
    }

    #[test]
    fn test_default_ensure_available() {
        assert!(Upper.ensure_available().is_ok());
    }

    #[test]
    fn test_boxed_compiler() {
        let compiler: Box<dyn Compiler> = Box::new(Upper);
        let out = compiler.compile("a", &CompileOptions::default()).unwrap();
        assert_eq!(out, CompileOutput::js("A"));
    }

    #[test]
    fn test_borrowed_compiler() {
        let compiler = &Upper;
        let out = compiler.compile("b", &CompileOptions::default()).unwrap();
        assert_eq!(out.js, "B");
        assert!(out.source_map.is_none());
    }
}
