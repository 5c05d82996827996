//! File filtering for watch events.
//!
//! Filters run on the blocking watcher thread, before an event reaches the
//! channel. Only CoffeeScript sources outside dependency and VCS directories
//! are interesting to the compile loop, so [`SourceFilter`] is the usual
//! choice.
//!
//! # Examples
//!
//! ```
//! use cw_watcher::{FileFilter, SourceFilter};
//! use camino::Utf8Path;
//!
//! let filter = SourceFilter::default();
//!
//! assert!(filter.should_process(Utf8Path::new("/proj/src/app.coffee")));
//! assert!(filter.should_process(Utf8Path::new("/proj/docs/guide.litcoffee")));
//!
//! assert!(!filter.should_process(Utf8Path::new("/proj/src/app.js")));
//! assert!(!filter.should_process(Utf8Path::new("/proj/node_modules/x/index.coffee")));
//! ```

use std::sync::Arc;

use camino::{Utf8Component, Utf8Path};
use cw_core::is_source_file;
use smallvec::SmallVec;

/// Directory names whose contents never trigger a compile.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", "bower_components"];

/// A filter for determining which file events to process.
///
/// Filters must be [`Send`] and [`Sync`] because they are used from the
/// blocking watcher thread, and `'static` to be moved into the spawned task.
///
/// # Examples
///
/// ```
/// use cw_watcher::FileFilter;
/// use camino::Utf8Path;
///
/// struct OnlyApp;
///
/// impl FileFilter for OnlyApp {
///     fn should_process(&self, path: &Utf8Path) -> bool {
///         path.starts_with("/proj/app")
///     }
/// }
///
/// assert!(OnlyApp.should_process(Utf8Path::new("/proj/app/a.coffee")));
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if an event on `path` should be sent to the channel.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all files.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AcceptAllFilter;

#[cfg(test)]
impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Accepts CoffeeScript sources that are not inside an excluded directory.
///
/// Source detection is suffix based (`.coffee`, `.coffee.md`, `.litcoffee`),
/// the same rule the runner applies, so removed files pass too.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    excluded_dirs: SmallVec<[String; 4]>,
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self {
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|d| (*d).to_owned()).collect(),
        }
    }
}

impl SourceFilter {
    /// Creates a filter with the default exclusions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory name to exclude.
    #[must_use]
    pub fn exclude_dir(mut self, name: impl Into<String>) -> Self {
        self.excluded_dirs.push(name.into());
        self
    }

    /// Returns the excluded directory names.
    #[must_use]
    pub fn excluded_dirs(&self) -> &[String] {
        &self.excluded_dirs
    }

    fn is_excluded(&self, path: &Utf8Path) -> bool {
        path.components().any(|component| match component {
            Utf8Component::Normal(name) => self.excluded_dirs.iter().any(|d| d == name),
            _ => false,
        })
    }
}

impl FileFilter for SourceFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        is_source_file(path) && !self.is_excluded(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    #[inline]
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Arc<F> {
    #[inline]
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}
