//! Source discovery for full runs.
//!
//! [`SourceWalker`] finds every CoffeeScript source under the working root
//! using the `ignore` crate, so `.gitignore`d trees and hidden directories
//! are skipped the same way the user's editor and VCS skip them.

use camino::{Utf8Path, Utf8PathBuf};
use cw_core::is_source_file;
use ignore::WalkBuilder;
use tracing::debug;

use crate::error::RunnerError;

/// Directories never searched for sources.
const SKIP_DIRECTORIES: &[&str] = &["node_modules", ".git", "bower_components"];

/// Walks a directory tree collecting CoffeeScript sources.
///
/// # Examples
///
/// ```no_run
/// use cw_runner::SourceWalker;
/// use camino::Utf8Path;
///
/// let sources = SourceWalker::new(Utf8Path::new("."))
///     .with_skip_dirs(&["vendor"])
///     .collect_sources()?;
///
/// for source in &sources {
///     println!("{source}");
/// }
/// # Ok::<(), cw_runner::RunnerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SourceWalker {
    root: Utf8PathBuf,
    skip_dirs: Vec<String>,
    follow_links: bool,
}

impl SourceWalker {
    /// Creates a walker for `root`.
    #[must_use]
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            root: root.to_path_buf(),
            skip_dirs: Vec::new(),
            follow_links: false,
        }
    }

    /// Adds directory names to skip, beyond the defaults.
    #[must_use]
    pub fn with_skip_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.skip_dirs
            .extend(dirs.into_iter().map(|d| d.as_ref().to_owned()));
        self
    }

    /// Configures whether symbolic links are followed. Off by default.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Returns every source below the root, relative to it and sorted.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Walk`] if traversal fails and
    /// [`RunnerError::NonUtf8Path`] for a path that is not UTF-8.
    pub fn collect_sources(&self) -> Result<Vec<Utf8PathBuf>, RunnerError> {
        let mut sources = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(true)
            .follow_links(self.follow_links)
            .require_git(false)
            .build();

        for result in walker {
            let entry = result?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = Utf8Path::from_path(entry.path())
                .ok_or_else(|| RunnerError::NonUtf8Path(entry.path().to_path_buf()))?;
            let relative = path.strip_prefix(&self.root).unwrap_or(path);

            if is_source_file(relative) && !self.should_skip_path(relative) {
                sources.push(relative.to_path_buf());
            }
        }

        sources.sort();
        debug!(root = %self.root, count = sources.len(), "Discovered sources");
        Ok(sources)
    }

    fn should_skip_path(&self, path: &Utf8Path) -> bool {
        path.components().any(|component| {
            let name = component.as_str();
            SKIP_DIRECTORIES.contains(&name) || self.skip_dirs.iter().any(|d| d == name)
        })
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}
