//! Domain types for coffeewatch.
//!
//! # Module Organization
//!
//! - [`source`] - Source dialects and output filename rewriting
//! - [`summary`] - Per-file errors and run summaries
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use cw_core::{RunSummary, SourceDialect};
//! ```

pub mod source;
pub mod summary;

pub use source::{
    OUTPUT_EXTENSION, SOURCE_MAP_EXTENSION, SOURCE_SUFFIXES, SourceDialect, is_source_file,
    output_file_name, output_path_for, source_map_file_name,
};
pub use summary::{FileError, RunSummary, join_paths};
