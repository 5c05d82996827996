//! Watch patterns.
//!
//! A [`WatchPattern`] is a regular expression over source paths relative to
//! the working root. When it has a first capture group, the captured text is
//! the sub-path nested routing mirrors into the output root.

use std::fmt;

use camino::Utf8Path;
use cw_core::RunOptions;
use regex::Regex;

use crate::error::RunnerError;

/// Source suffix alternation used by derived input patterns.
const SOURCE_ALTERNATION: &str = r"(?:coffee|coffee\.md|litcoffee)";

/// The outcome of matching a path against a [`WatchPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMatch<'p> {
    /// The pattern captured a relative sub-path.
    SubPath(&'p Utf8Path),

    /// The pattern matched without capturing anything.
    Whole,
}

/// A compiled watch pattern.
///
/// # Examples
///
/// ```
/// use cw_runner::{PatternMatch, WatchPattern};
/// use camino::Utf8Path;
///
/// let pattern = WatchPattern::new(r"^app/coffeescripts/(.+\.coffee)$")?;
/// assert_eq!(
///     pattern.match_path(Utf8Path::new("app/coffeescripts/x/a.coffee")),
///     Some(PatternMatch::SubPath(Utf8Path::new("x/a.coffee")))
/// );
/// assert_eq!(pattern.match_path(Utf8Path::new("lib/a.coffee")), None);
/// # Ok::<(), cw_runner::RunnerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WatchPattern {
    regex: Regex,
}

impl WatchPattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::InvalidPattern`] if `pattern` is not a valid
    /// regular expression.
    pub fn new(pattern: &str) -> Result<Self, RunnerError> {
        Regex::new(pattern)
            .map(|regex| Self { regex })
            .map_err(|e| RunnerError::invalid_pattern(pattern, e))
    }

    /// Builds the pattern watching every source under `input`.
    ///
    /// The whole path below `input` is captured, so nested routing mirrors
    /// the input tree.
    pub fn for_input_dir(input: &Utf8Path) -> Result<Self, RunnerError> {
        let dir = regex::escape(input.as_str().trim_end_matches('/'));
        Self::new(&format!("^{dir}/(.+\\.{SOURCE_ALTERNATION})$"))
    }

    /// Returns the pattern source.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns `true` if the pattern matches `path`.
    #[inline]
    #[must_use]
    pub fn is_match(&self, path: &Utf8Path) -> bool {
        self.regex.is_match(path.as_str())
    }

    /// Matches `path`, returning the captured sub-path when there is one.
    #[must_use]
    pub fn match_path<'p>(&self, path: &'p Utf8Path) -> Option<PatternMatch<'p>> {
        let captures = self.regex.captures(path.as_str())?;
        Some(match captures.get(1) {
            Some(sub) => PatternMatch::SubPath(Utf8Path::new(sub.as_str())),
            None => PatternMatch::Whole,
        })
    }
}

impl fmt::Display for WatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiles configured patterns, appending the one derived from `input`.
///
/// # Errors
///
/// Returns the first [`RunnerError::InvalidPattern`] encountered.
pub fn compile_patterns<S: AsRef<str>>(
    patterns: &[S],
    options: &RunOptions,
) -> Result<Vec<WatchPattern>, RunnerError> {
    let mut compiled = patterns
        .iter()
        .map(|p| WatchPattern::new(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(input) = &options.input {
        compiled.push(WatchPattern::for_input_dir(input)?);
    }

    Ok(compiled)
}
