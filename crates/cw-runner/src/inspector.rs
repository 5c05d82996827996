//! Candidate path filtering.
//!
//! The watcher and the command line hand the runner raw path lists. The
//! [`Inspector`] reduces them to the CoffeeScript sources worth compiling:
//! de-duplicated in first-seen order, empty entries dropped, unrecognised
//! suffixes dropped, and (for compile runs) missing files dropped.
//!
//! Nothing the inspector drops is an error; skipped paths are only traced.

use camino::{Utf8Path, Utf8PathBuf};
use cw_core::is_source_file;
use rustc_hash::FxHashSet;
use tracing::trace;

/// Options for [`Inspector::clean`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanOptions {
    /// Keep paths that no longer exist on disk.
    ///
    /// Set by the removal path, where the source is gone by definition.
    pub allow_missing: bool,
}

/// Filters candidate paths down to valid source files.
///
/// Relative paths are checked for existence against the working root.
///
/// # Examples
///
/// ```
/// use cw_runner::{CleanOptions, Inspector};
/// use camino::Utf8Path;
///
/// let inspector = Inspector::new(Utf8Path::new("/nonexistent"));
/// let removed = inspector.clean(
///     ["a.coffee", "", "a.coffee", "b.js", "c.litcoffee"],
///     CleanOptions { allow_missing: true },
/// );
///
/// assert_eq!(removed, ["a.coffee", "c.litcoffee"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Inspector<'a> {
    working_root: &'a Utf8Path,
}

impl<'a> Inspector<'a> {
    /// Creates an inspector resolving relative paths against `working_root`.
    #[must_use]
    pub const fn new(working_root: &'a Utf8Path) -> Self {
        Self { working_root }
    }

    /// Returns the valid source files among `paths`, in first-seen order.
    ///
    /// Cleaning is idempotent: cleaning an already clean list returns it
    /// unchanged.
    pub fn clean<I, S>(&self, paths: I, options: CleanOptions) -> Vec<Utf8PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = FxHashSet::default();
        let mut cleaned = Vec::new();

        for raw in paths {
            let raw = raw.as_ref();
            if raw.is_empty() || !seen.insert(raw.to_owned()) {
                continue;
            }

            let path = Utf8Path::new(raw);
            if !is_source_file(path) {
                trace!(path = raw, "Skipping non-CoffeeScript path");
                continue;
            }
            if !options.allow_missing && !self.is_existing_file(path) {
                trace!(path = raw, "Skipping missing source");
                continue;
            }

            cleaned.push(path.to_path_buf());
        }

        cleaned
    }

    fn is_existing_file(&self, path: &Utf8Path) -> bool {
        if path.is_absolute() {
            path.is_file()
        } else {
            self.working_root.join(path).is_file()
        }
    }
}
