//! Source dialect detection and output filename rewriting.
//!
//! CoffeeScript sources come in two dialects that share a compiler but not a
//! parsing mode:
//!
//! | Suffix        | Dialect                            |
//! |---------------|------------------------------------|
//! | `.coffee`     | [`SourceDialect::Plain`]           |
//! | `.coffee.md`  | [`SourceDialect::Literate`]        |
//! | `.litcoffee`  | [`SourceDialect::Literate`]        |
//!
//! Every source maps to exactly one `.js` output name. A `.js` segment in front
//! of the source suffix (`app.js.coffee`) is folded into the output suffix, so
//! the result never carries a residual fragment.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Suffixes recognised as CoffeeScript sources, longest first.
///
/// Order matters: `.coffee.md` must be tested before anything that could
/// match a shorter tail of the same name.
pub const SOURCE_SUFFIXES: [&str; 3] = [".coffee.md", ".litcoffee", ".coffee"];

/// Extension given to compiled output files.
pub const OUTPUT_EXTENSION: &str = "js";

/// Extension appended to an output filename to name its source map sidecar.
pub const SOURCE_MAP_EXTENSION: &str = "map";

/// The flavour of a CoffeeScript source file.
///
/// # Examples
///
/// ```
/// use cw_core::SourceDialect;
/// use camino::Utf8Path;
///
/// assert_eq!(SourceDialect::detect(Utf8Path::new("a.coffee")), Some(SourceDialect::Plain));
/// assert_eq!(SourceDialect::detect(Utf8Path::new("b.coffee.md")), Some(SourceDialect::Literate));
/// assert_eq!(SourceDialect::detect(Utf8Path::new("c.js")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDialect {
    /// Plain CoffeeScript (`.coffee`).
    Plain,

    /// Literate CoffeeScript embedded in Markdown (`.coffee.md`, `.litcoffee`).
    Literate,
}

impl SourceDialect {
    /// Detects the dialect of `path` from its file name.
    ///
    /// Returns `None` when the name carries no recognised source suffix.
    #[must_use]
    pub fn detect(path: &Utf8Path) -> Option<Self> {
        let name = path.file_name()?;
        if name.ends_with(".coffee.md") || name.ends_with(".litcoffee") {
            Some(Self::Literate)
        } else if name.ends_with(".coffee") {
            Some(Self::Plain)
        } else {
            None
        }
    }

    /// Returns `true` for the literate dialect.
    #[inline]
    #[must_use]
    pub const fn is_literate(self) -> bool {
        matches!(self, Self::Literate)
    }
}

/// Returns `true` if `path` names a CoffeeScript source in either dialect.
///
/// # Examples
///
/// ```
/// use cw_core::is_source_file;
/// use camino::Utf8Path;
///
/// assert!(is_source_file(Utf8Path::new("src/app.js.coffee")));
/// assert!(is_source_file(Utf8Path::new("docs/readme.litcoffee")));
/// assert!(!is_source_file(Utf8Path::new("src/app.coffeescript")));
/// ```
#[inline]
#[must_use]
pub fn is_source_file(path: &Utf8Path) -> bool {
    SourceDialect::detect(path).is_some()
}

/// Strips the source suffix (and a preceding `.js` segment) from a file name.
fn source_stem(name: &str) -> Option<&str> {
    let suffix = SOURCE_SUFFIXES
        .iter()
        .find(|suffix| name.ends_with(*suffix))?;
    let stem = &name[..name.len() - suffix.len()];
    Some(stem.strip_suffix(".js").unwrap_or(stem))
}

/// Rewrites the file name of a source into its compiled output name.
///
/// Only the file name is considered; directories are dropped.
///
/// # Examples
///
/// ```
/// use cw_core::output_file_name;
/// use camino::Utf8Path;
///
/// assert_eq!(output_file_name(Utf8Path::new("src/a.coffee")).as_deref(), Some("a.js"));
/// assert_eq!(output_file_name(Utf8Path::new("src/b.js.coffee.md")).as_deref(), Some("b.js"));
/// assert_eq!(output_file_name(Utf8Path::new("src/c.txt")), None);
/// ```
#[must_use]
pub fn output_file_name(path: &Utf8Path) -> Option<String> {
    let stem = source_stem(path.file_name()?)?;
    Some(format!("{stem}.{OUTPUT_EXTENSION}"))
}

/// Rewrites a whole source path, keeping its directory components.
///
/// Used for the generated-file name in source map descriptors, where the
/// path relative to the input directory is preserved.
#[must_use]
pub fn output_path_for(path: &Utf8Path) -> Option<Utf8PathBuf> {
    let name = output_file_name(path)?;
    Some(match path.parent() {
        Some(parent) => parent.join(name),
        None => Utf8PathBuf::from(name),
    })
}

/// Returns the sidecar name for a compiled output file (`a.js` → `a.js.map`).
#[must_use]
pub fn source_map_file_name(output_name: &str) -> String {
    format!("{output_name}.{SOURCE_MAP_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_plain_and_literate() {
        assert_eq!(
            SourceDialect::detect(Utf8Path::new("src/a.coffee")),
            Some(SourceDialect::Plain)
        );
        assert_eq!(
            SourceDialect::detect(Utf8Path::new("src/b.coffee.md")),
            Some(SourceDialect::Literate)
        );
        assert_eq!(
            SourceDialect::detect(Utf8Path::new("src/c.litcoffee")),
            Some(SourceDialect::Literate)
        );
        assert_eq!(SourceDialect::detect(Utf8Path::new("src/d.md")), None);
        assert_eq!(SourceDialect::detect(Utf8Path::new("x/d.coffeeemd")), None);
    }

    #[test]
    fn test_detect_ignores_directory_names() {
        assert_eq!(
            SourceDialect::detect(Utf8Path::new("lib.coffee/readme.txt")),
            None
        );
    }

    #[test]
    fn test_is_literate() {
        assert!(SourceDialect::Literate.is_literate());
        assert!(!SourceDialect::Plain.is_literate());
    }

    #[test]
    fn test_output_file_name_single_suffix() {
        for (source, expected) in [
            ("a.coffee", "a.js"),
            ("b.coffee.md", "b.js"),
            ("c.litcoffee", "c.js"),
        ] {
            assert_eq!(
                output_file_name(Utf8Path::new(source)).as_deref(),
                Some(expected),
                "{source}"
            );
        }
    }

    #[test]
    fn test_output_file_name_double_suffix() {
        for (source, expected) in [
            ("src/a.js.coffee", "a.js"),
            ("src/b.js.coffee.md", "b.js"),
            ("src/c.js.litcoffee", "c.js"),
        ] {
            assert_eq!(
                output_file_name(Utf8Path::new(source)).as_deref(),
                Some(expected),
                "{source}"
            );
        }
    }

    #[test]
    fn test_output_file_name_keeps_inner_dots() {
        assert_eq!(
            output_file_name(Utf8Path::new("jquery.plugin.coffee")).as_deref(),
            Some("jquery.plugin.js")
        );
        assert_eq!(
            output_file_name(Utf8Path::new("ajs.coffee")).as_deref(),
            Some("ajs.js")
        );
    }

    #[test]
    fn test_output_path_for_keeps_directories() {
        assert_eq!(
            output_path_for(Utf8Path::new("x/y/a.js.coffee")),
            Some(Utf8PathBuf::from("x/y/a.js"))
        );
        assert_eq!(
            output_path_for(Utf8Path::new("a.coffee")),
            Some(Utf8PathBuf::from("a.js"))
        );
    }

    #[test]
    fn test_source_map_file_name() {
        assert_eq!(source_map_file_name("a.js"), "a.js.map");
    }

    #[test]
    fn test_dialect_serialization() {
        assert_eq!(
            serde_json::to_string(&SourceDialect::Literate).unwrap(),
            r#""literate""#
        );
    }
}
