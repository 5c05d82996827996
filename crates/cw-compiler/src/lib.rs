//! CoffeeScript compilation for coffeewatch.
//!
//! The runner never compiles anything itself; it drives a [`Compiler`]. This
//! crate defines that capability, the per-file [`CompileOptions`] it is
//! called with, and [`CoffeeCommand`], the implementation backed by the
//! `coffee` executable.
//!
//! # Overview
//!
//! ```no_run
//! use camino::Utf8Path;
//! use cw_compiler::{CoffeeCommand, CompileOptions, Compiler};
//! use cw_core::RunOptions;
//!
//! let run = RunOptions::default();
//! let options = CompileOptions::for_file(Utf8Path::new("app/notes.litcoffee"), &run);
//! assert!(options.literate);
//!
//! let coffee = CoffeeCommand::new();
//! let out = coffee.compile("Some prose.\n\n    x = 1\n", &options)?;
//! print!("{}", out.js);
//! # Ok::<(), cw_compiler::CompilerError>(())
//! ```
//!
//! # Errors
//!
//! A rejected source is a [`CompilerError::Syntax`] carrying the compiler's
//! message verbatim. A compiler that cannot be found or launched is
//! [`CompilerError::Unavailable`], which the runner reports once per run.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod coffee;
pub mod compiler;
pub mod error;
pub mod options;

pub use coffee::{CoffeeCommand, DEFAULT_PROGRAM};
pub use compiler::{CompileOutput, Compiler};
pub use error::CompilerError;
pub use options::{CompileOptions, SourceMapOptions};
