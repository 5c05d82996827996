//! Configuration structures for coffeewatch.
//!
//! This module provides configuration types for all components:
//!
//! - [`RunOptions`] - Per-run compile options (routing, wrapping, source maps)
//! - [`BareOption`] - Global or per-file suppression of the top-level wrapper
//! - [`UnmatchedPolicy`] - Where nested routing sends files no pattern matches
//! - [`WatchConfig`] - File watcher settings (debouncing, recursion)
//! - [`Config`] - Root configuration combining all settings, loadable from JSON
//!
//! All configuration types implement [`Default`] and deserialize with missing
//! fields filled from those defaults.

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Controls whether compiled output is wrapped in a top-level function.
///
/// Deserializes from either a boolean or a list of file names:
///
/// ```
/// use cw_core::BareOption;
/// use camino::Utf8Path;
///
/// let all: BareOption = serde_json::from_str("true").unwrap();
/// assert!(all.is_bare(Utf8Path::new("src/any.coffee")));
///
/// let some: BareOption = serde_json::from_str(r#"["a.coffee"]"#).unwrap();
/// assert!(some.is_bare(Utf8Path::new("src/a.coffee")));
/// assert!(!some.is_bare(Utf8Path::new("src/b.coffee")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BareOption {
    /// The same setting for every file.
    Always(bool),

    /// Only the listed file names (basenames) are compiled bare.
    PerFile(FxHashSet<String>),
}

impl BareOption {
    /// Builds a per-file option from a list of basenames.
    #[must_use]
    pub fn per_file<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PerFile(names.into_iter().map(Into::into).collect())
    }

    /// Resolves the effective bare flag for `file`.
    ///
    /// Per-file sets are matched against the file's basename only.
    #[must_use]
    pub fn is_bare(&self, file: &Utf8Path) -> bool {
        match self {
            Self::Always(bare) => *bare,
            Self::PerFile(names) => file.file_name().is_some_and(|name| names.contains(name)),
        }
    }
}

impl Default for BareOption {
    fn default() -> Self {
        Self::Always(false)
    }
}

impl From<bool> for BareOption {
    fn from(bare: bool) -> Self {
        Self::Always(bare)
    }
}

/// What nested routing does with a file that no watch pattern matches.
///
/// Shallow routing ignores patterns and is unaffected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Leave the file unrouted; it is neither compiled nor removed.
    #[default]
    Skip,

    /// Route the file next to its source.
    SourceDirectory,

    /// Route the file to the output root, or next to its source when no
    /// output root is configured.
    OutputRoot,
}

/// Options for a single compile or removal run.
///
/// Constructed once by the host and read-only to the engine.
///
/// # Examples
///
/// ```
/// use cw_core::RunOptions;
/// use camino::Utf8Path;
///
/// let options = RunOptions {
///     input: Some("app/coffeescripts".into()),
///     ..RunOptions::default()
/// };
///
/// // Output falls back to the input directory.
/// assert_eq!(options.output_root(), Some(Utf8Path::new("app/coffeescripts")));
/// assert_eq!(options.source_root_value(), "app/coffeescripts");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Input directory. Derives a watch pattern and relativizes source maps.
    pub input: Option<Utf8PathBuf>,

    /// Output root. Defaults to `input`, then to the working directory.
    pub output: Option<Utf8PathBuf>,

    /// Write every output into the output root, ignoring source structure.
    pub shallow: bool,

    /// Suppress the top-level function wrapper.
    pub bare: BareOption,

    /// Parse every file as literate CoffeeScript.
    ///
    /// Literate-dialect files are always parsed as literate.
    pub literate: bool,

    /// Suppress success notices after a successful run.
    pub hide_success: bool,

    /// Route and compile, but never touch the disk.
    pub noop: bool,

    /// Write a throwing stub in place of an output that failed to compile.
    pub error_to_output: bool,

    /// Emit a `.js.map` sidecar for every output.
    pub source_map: bool,

    /// Source root recorded in source maps. Defaults to `input`.
    pub source_root: Option<String>,

    /// Replaces the default start notice.
    pub message: Option<String>,

    /// Compile every matching source when the watcher starts.
    pub all_on_start: bool,

    /// Routing fallback for files no pattern matches.
    pub unmatched: UnmatchedPolicy,
}

impl RunOptions {
    /// Returns the effective output root, if any.
    #[must_use]
    pub fn output_root(&self) -> Option<&Utf8Path> {
        self.output.as_deref().or(self.input.as_deref())
    }

    /// Returns `true` if `file` should be compiled without the wrapper.
    #[inline]
    #[must_use]
    pub fn is_bare(&self, file: &Utf8Path) -> bool {
        self.bare.is_bare(file)
    }

    /// Returns the source root for source maps: explicit, then input, then empty.
    #[must_use]
    pub fn source_root_value(&self) -> &str {
        self.source_root
            .as_deref()
            .or_else(|| self.input.as_deref().map(Utf8Path::as_str))
            .unwrap_or("")
    }

    /// Checks the options for values the engine cannot honour.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidPath`] for an empty `input`
    /// - [`ConfigError::InvalidOption`] for per-file bare entries containing a
    ///   path separator (they are matched against basenames only)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(input) = &self.input {
            if input.as_str().is_empty() {
                return Err(ConfigError::InvalidPath {
                    path: input.clone(),
                    reason: "input directory must not be empty".to_owned(),
                });
            }
        }

        if let BareOption::PerFile(names) = &self.bare {
            if let Some(bad) = names.iter().find(|name| name.contains('/')) {
                return Err(ConfigError::invalid_option(
                    "bare",
                    format!("'{bad}' is not a file name; entries are matched by basename"),
                ));
            }
        }

        Ok(())
    }
}

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use cw_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds.
    ///
    /// Multiple file changes within this window are batched into a single run.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            recursive: true,
        }
    }
}

/// Settings for finding sources on disk.
///
/// Applies to compile-all runs and, for `skip_dirs`, to which watch events
/// are considered. Dependency and VCS directories are always skipped.
///
/// # Examples
///
/// ```
/// use cw_core::SourcesConfig;
///
/// let sources: SourcesConfig = serde_json::from_str(r#"{ "skip_dirs": ["vendor"] }"#).unwrap();
/// assert_eq!(sources.skip_dirs, ["vendor"]);
/// assert!(!sources.follow_links);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Extra directory names to skip.
    pub skip_dirs: Vec<String>,

    /// Follow symbolic links while searching for sources.
    pub follow_links: bool,
}

/// Root configuration, usually read from `coffeewatch.json`.
///
/// # Examples
///
/// ```
/// use cw_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{
///     "patterns": ["^app/coffeescripts/(.+\\.coffee)$"],
///     "run": { "output": "public/javascripts", "bare": ["vendor.coffee"] }
/// }"#).unwrap();
///
/// assert_eq!(config.patterns.len(), 1);
/// assert_eq!(config.watch.debounce_ms, 100);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File watcher configuration.
    pub watch: WatchConfig,

    /// Options applied to every run.
    pub run: RunOptions,

    /// Source discovery settings.
    pub sources: SourcesConfig,

    /// Watch patterns as regular expressions. Capture group 1, when present,
    /// is the sub-path mirrored by nested routing.
    pub patterns: Vec<String>,
}

impl Config {
    /// Name of the configuration file looked up in the working root.
    pub const FILE_NAME: &'static str = "coffeewatch.json";

    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON for this structure, and
    /// any error from [`RunOptions::validate`].
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.run.validate()?;
        Ok(config)
    }

    /// Loads `coffeewatch.json` from `root` when present, else the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_file`] when the file exists.
    pub fn discover(root: &Utf8Path) -> Result<Self, ConfigError> {
        let path = root.join(Self::FILE_NAME);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_options_defaults() {
        let options = RunOptions::default();
        assert_eq!(options.bare, BareOption::Always(false));
        assert!(!options.shallow);
        assert!(!options.hide_success);
        assert!(!options.noop);
        assert!(!options.source_map);
        assert!(!options.all_on_start);
        assert_eq!(options.unmatched, UnmatchedPolicy::Skip);
        assert_eq!(options.output_root(), None);
        assert_eq!(options.source_root_value(), "");
    }

    #[test]
    fn test_output_root_prefers_output() {
        let options = RunOptions {
            input: Some("app/coffeescripts".into()),
            output: Some("public/javascripts".into()),
            ..RunOptions::default()
        };
        assert_eq!(options.output_root(), Some(Utf8Path::new("public/javascripts")));
    }

    #[test]
    fn test_source_root_prefers_explicit_value() {
        let options = RunOptions {
            input: Some("src".into()),
            source_root: Some("foo".to_owned()),
            ..RunOptions::default()
        };
        assert_eq!(options.source_root_value(), "foo");
    }

    #[test]
    fn test_bare_option_per_file_matches_basename() {
        let bare = BareOption::per_file(["a.coffee"]);
        assert!(bare.is_bare(Utf8Path::new("src/a.coffee")));
        assert!(bare.is_bare(Utf8Path::new("a.coffee")));
        assert!(!bare.is_bare(Utf8Path::new("src/b.coffee")));
        assert!(!bare.is_bare(Utf8Path::new("src/a.coffee/")));
    }

    #[test]
    fn test_bare_option_always() {
        assert!(BareOption::from(true).is_bare(Utf8Path::new("x.coffee")));
        assert!(!BareOption::from(false).is_bare(Utf8Path::new("x.coffee")));
    }

    #[test]
    fn test_validate_rejects_bare_paths() {
        let options = RunOptions {
            bare: BareOption::per_file(["src/a.coffee"]),
            ..RunOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_input() {
        let options = RunOptions {
            input: Some(Utf8PathBuf::new()),
            ..RunOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.debounce_ms, 100);
        assert!(config.recursive);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config {
            patterns: vec![r"^src/(.+\.coffee)$".to_owned()],
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"run": {"shallow": true, "unmatched": "source_directory"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.run.shallow);
        assert_eq!(config.run.unmatched, UnmatchedPolicy::SourceDirectory);
        assert_eq!(config.watch.debounce_ms, 100);
        assert_eq!(config.sources, SourcesConfig::default());
        assert!(config.patterns.is_empty());
    }

    #[test]
    fn test_config_from_file_and_discover() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let missing = Config::discover(root).unwrap();
        assert_eq!(missing, Config::default());

        std::fs::write(
            root.join(Config::FILE_NAME),
            r#"{"run": {"output": "javascripts", "noop": true}}"#,
        )
        .unwrap();
        let found = Config::discover(root).unwrap();
        assert_eq!(found.run.output.as_deref(), Some(Utf8Path::new("javascripts")));
        assert!(found.run.noop);
    }

    #[test]
    fn test_config_from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let path = root.join(Config::FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
    }
}
