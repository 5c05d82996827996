//! Per-file compile options.
//!
//! [`CompileOptions::for_file`] folds the run-wide [`RunOptions`] down to the
//! settings one source file is compiled with: literate parsing forced on by
//! the file's dialect, the bare flag resolved against a per-file list, and a
//! source map descriptor when maps are requested.

use camino::{Utf8Path, Utf8PathBuf};
use cw_core::{RunOptions, SourceDialect, output_path_for};
use serde::Serialize;

/// Source map settings for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapOptions {
    /// Name of the generated JavaScript file, relative like `source_files`.
    pub generated_file: Utf8PathBuf,

    /// Originating sources, relative to the source root when possible.
    pub source_files: Vec<Utf8PathBuf>,

    /// Root that `source_files` are relative to.
    pub source_root: String,
}

/// Settings one source file is compiled with.
///
/// # Examples
///
/// ```
/// use cw_compiler::CompileOptions;
/// use cw_core::RunOptions;
/// use camino::Utf8Path;
///
/// let run = RunOptions::default();
///
/// let plain = CompileOptions::for_file(Utf8Path::new("a.coffee"), &run);
/// assert!(!plain.literate);
///
/// let literate = CompileOptions::for_file(Utf8Path::new("b.coffee.md"), &run);
/// assert!(literate.literate);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileOptions {
    /// Compile without the top-level function wrapper.
    pub bare: bool,

    /// Parse the source as literate CoffeeScript.
    pub literate: bool,

    /// Source map descriptor, present only when maps are requested.
    pub source_map: Option<SourceMapOptions>,
}

impl CompileOptions {
    /// Derives the options for `file` from the run options.
    #[must_use]
    pub fn for_file(file: &Utf8Path, options: &RunOptions) -> Self {
        let literate = options.literate
            || SourceDialect::detect(file).is_some_and(SourceDialect::is_literate);

        Self {
            bare: options.is_bare(file),
            literate,
            source_map: options
                .source_map
                .then(|| SourceMapOptions::for_file(file, options)),
        }
    }
}

impl SourceMapOptions {
    /// Builds the descriptor for `file`.
    #[must_use]
    pub fn for_file(file: &Utf8Path, options: &RunOptions) -> Self {
        let relative = relative_source(file, options);
        let generated_file = output_path_for(&relative).unwrap_or_else(|| relative.clone());

        Self {
            generated_file,
            source_files: vec![relative],
            source_root: options.source_root_value().to_owned(),
        }
    }
}

/// Makes `file` relative to the source root or the input directory.
///
/// Falls back to `file` unchanged when neither is one of its prefixes.
fn relative_source(file: &Utf8Path, options: &RunOptions) -> Utf8PathBuf {
    let bases = [
        options.source_root.as_deref().map(Utf8Path::new),
        options.input.as_deref(),
    ];

    bases
        .into_iter()
        .flatten()
        .filter(|base| !base.as_str().is_empty())
        .find_map(|base| file.strip_prefix(base).ok())
        .map_or_else(|| file.to_path_buf(), Utf8Path::to_path_buf)
}
