//! Output routing.
//!
//! Routing decides where each source's artifact lands. It is a pure function
//! of the files, the watch patterns and the [`RunOptions`]: removal runs
//! recompute the same decisions to find what a compile run produced.
//!
//! Two strategies are supported:
//!
//! - **Shallow**: every file goes to the output root.
//! - **Nested**: every (pattern, file) pair that matches contributes a
//!   destination. With a capture group the destination mirrors the captured
//!   sub-path under the output root; without one it is the output root, or
//!   the source's own directory when no output root is configured.
//!
//! ```text
//! app/coffeescripts/x/y/a.coffee   pattern ^app/coffeescripts/(.+\.coffee)$
//!                   └──┬───────┘   output  javascripts
//!                   captured
//! shallow  →  javascripts/a.js
//! nested   →  javascripts/x/y/a.js
//! ```

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cw_core::{RunOptions, UnmatchedPolicy, output_file_name, source_map_file_name};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::pattern::{PatternMatch, WatchPattern};

/// Where one source's artifact is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// The source file, as given to the router.
    pub source: Utf8PathBuf,

    /// Directory the artifact is written to. Empty means the working root.
    pub destination_directory: Utf8PathBuf,

    /// File name of the primary artifact, e.g. `a.js`.
    pub destination_filename: String,
}

impl RoutingDecision {
    /// Returns the primary artifact path.
    ///
    /// # Examples
    ///
    /// ```
    /// use cw_runner::RoutingDecision;
    ///
    /// let decision = RoutingDecision {
    ///     source: "app/a.js.coffee".into(),
    ///     destination_directory: "public".into(),
    ///     destination_filename: "a.js".to_owned(),
    /// };
    /// assert_eq!(decision.output_path(), "public/a.js");
    /// assert_eq!(decision.source_map_path(), "public/a.js.map");
    /// ```
    #[must_use]
    pub fn output_path(&self) -> Utf8PathBuf {
        self.destination_directory.join(&self.destination_filename)
    }

    /// Returns the source map sidecar path.
    #[must_use]
    pub fn source_map_path(&self) -> Utf8PathBuf {
        self.destination_directory
            .join(source_map_file_name(&self.destination_filename))
    }
}

/// Destination directories and the files routed to each.
///
/// Destinations keep the order they were first produced in, and files keep
/// their order within a destination. A file appears at most once per
/// destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routes {
    entries: Vec<(Utf8PathBuf, Vec<Utf8PathBuf>)>,
    index: FxHashMap<Utf8PathBuf, usize>,
}

impl Routes {
    fn insert(&mut self, directory: Utf8PathBuf, file: &Utf8Path) {
        let slot = match self.index.get(&directory) {
            Some(&slot) => slot,
            None => {
                self.index.insert(directory.clone(), self.entries.len());
                self.entries.push((directory, Vec::new()));
                self.entries.len() - 1
            }
        };

        let files = &mut self.entries[slot].1;
        if !files.iter().any(|f| f == file) {
            files.push(file.to_path_buf());
        }
    }

    /// Returns the number of destination directories.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no file was routed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates destinations with their files, in routing order.
    pub fn iter(&self) -> impl Iterator<Item = (&Utf8Path, &[Utf8PathBuf])> {
        self.entries
            .iter()
            .map(|(dir, files)| (dir.as_path(), files.as_slice()))
    }

    /// Returns the files routed to `directory`, if any.
    #[must_use]
    pub fn files_in(&self, directory: &Utf8Path) -> Option<&[Utf8PathBuf]> {
        self.index
            .get(directory)
            .map(|&slot| self.entries[slot].1.as_slice())
    }

    /// Flattens the routes into one decision per (destination, file) pair.
    ///
    /// Files without a recognised source suffix have no output name and are
    /// left out.
    #[must_use]
    pub fn decisions(&self) -> Vec<RoutingDecision> {
        self.iter()
            .flat_map(|(dir, files)| {
                files.iter().filter_map(move |file| {
                    Some(RoutingDecision {
                        source: file.clone(),
                        destination_directory: dir.to_path_buf(),
                        destination_filename: output_file_name(file)?,
                    })
                })
            })
            .collect()
    }
}

/// Routes `files` to destination directories.
///
/// # Examples
///
/// ```
/// use cw_core::RunOptions;
/// use cw_runner::{WatchPattern, route};
/// use camino::{Utf8Path, Utf8PathBuf};
///
/// let patterns = [WatchPattern::new(r"^app/coffeescripts/(.+\.coffee)$")?];
/// let files = [Utf8PathBuf::from("app/coffeescripts/x/y/a.coffee")];
/// let options = RunOptions {
///     output: Some("javascripts".into()),
///     ..RunOptions::default()
/// };
///
/// let routes = route(&patterns, &files, &options);
/// assert!(routes.files_in(Utf8Path::new("javascripts/x/y")).is_some());
/// # Ok::<(), cw_runner::RunnerError>(())
/// ```
#[must_use]
pub fn route(patterns: &[WatchPattern], files: &[Utf8PathBuf], options: &RunOptions) -> Routes {
    let mut routes = Routes::default();
    let output = options.output_root();

    if options.shallow {
        let directory = output.map(Utf8Path::to_path_buf).unwrap_or_default();
        for file in files {
            routes.insert(directory.clone(), file);
        }
        return routes;
    }

    let mut matched = FxHashSet::default();

    for pattern in patterns {
        for file in files {
            let Some(found) = pattern.match_path(file) else {
                continue;
            };

            let directory = match found {
                PatternMatch::SubPath(sub) => mirrored_directory(output, sub),
                PatternMatch::Whole => {
                    output.map_or_else(|| parent_directory(file), Utf8Path::to_path_buf)
                }
            };

            debug!(file = %file, destination = %directory, pattern = %pattern, "Routed");
            matched.insert(file.as_path());
            routes.insert(directory, file);
        }
    }

    for file in files.iter().filter(|f| !matched.contains(f.as_path())) {
        let directory = match options.unmatched {
            UnmatchedPolicy::Skip => {
                trace!(file = %file, "No pattern matches; skipping");
                continue;
            }
            UnmatchedPolicy::SourceDirectory => parent_directory(file),
            UnmatchedPolicy::OutputRoot => {
                output.map_or_else(|| parent_directory(file), Utf8Path::to_path_buf)
            }
        };
        debug!(file = %file, destination = %directory, "Routed unmatched file");
        routes.insert(directory, file);
    }

    routes
}

/// `join(output, dirname(sub))` with any trailing `/.` removed.
///
/// The captured directory always nests under the output root, even when it
/// is absolute.
fn mirrored_directory(output: Option<&Utf8Path>, sub: &Utf8Path) -> Utf8PathBuf {
    let sub_dir = parent_directory(sub);
    let joined = match output {
        Some(root) => {
            let mut joined = root.to_path_buf();
            joined.extend(sub_dir.components().filter(|c| {
                !matches!(c, Utf8Component::RootDir | Utf8Component::Prefix(_))
            }));
            joined
        }
        None => sub_dir,
    };
    strip_current_dir(joined)
}

/// The directory part of `path`; empty for a bare file name.
fn parent_directory(path: &Utf8Path) -> Utf8PathBuf {
    strip_current_dir(path.parent().map(Utf8Path::to_path_buf).unwrap_or_default())
}

fn strip_current_dir(path: Utf8PathBuf) -> Utf8PathBuf {
    let mut text = path.as_str();
    while let Some(rest) = text.strip_suffix("/.") {
        text = rest;
    }
    if text == "." {
        text = "";
    }
    Utf8PathBuf::from(text)
}
