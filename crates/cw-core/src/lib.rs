//! Core types, configuration, and errors for coffeewatch.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Source dialect detection and `.coffee` → `.js` filename rewriting
//! - [`RunOptions`] and the rest of the configuration surface
//! - [`RunSummary`] and [`FileError`], the values a run hands back to its host
//! - [`ConfigError`] for configuration loading and validation

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    BareOption, Config, RunOptions, SourcesConfig, UnmatchedPolicy, WatchConfig,
};
pub use error::ConfigError;
pub use types::{
    FileError, OUTPUT_EXTENSION, RunSummary, SOURCE_MAP_EXTENSION, SOURCE_SUFFIXES, SourceDialect,
    is_source_file, join_paths, output_file_name, output_path_for, source_map_file_name,
};
