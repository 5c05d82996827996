//! Routing and compile orchestration for coffeewatch.
//!
//! This crate is the engine between a file watcher and the CoffeeScript
//! compiler. Given a batch of changed paths it decides which are sources,
//! where each one's JavaScript belongs, compiles them, writes the artifacts
//! and reports one outcome for the batch.
//!
//! # Overview
//!
//! The main entry point is [`Orchestrator`], which combines:
//!
//! - [`Inspector`]: filters raw paths down to existing CoffeeScript sources
//! - [`route`]: maps sources to destination directories via [`WatchPattern`]s
//! - [`ArtifactWriter`]: writes `.js` files and `.js.map` sidecars
//! - [`Reporter`]: receives the start notice and the run's outcome
//!
//! # Example
//!
//! ```no_run
//! use cw_compiler::CoffeeCommand;
//! use cw_core::RunOptions;
//! use cw_runner::{Orchestrator, TracingReporter, compile_patterns};
//!
//! let options = RunOptions {
//!     input: Some("app/coffeescripts".into()),
//!     output: Some("public/javascripts".into()),
//!     ..RunOptions::default()
//! };
//! let patterns = compile_patterns::<&str>(&[], &options)?;
//!
//! let mut orchestrator = Orchestrator::new(CoffeeCommand::new(), TracingReporter, ".");
//! let summary = orchestrator.run_all(&patterns, &options)?;
//! println!("{} artifacts, {} errors", summary.changed_artifacts.len(), summary.errors.len());
//! # Ok::<(), cw_runner::RunnerError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!     │
//!     ├── Inspector (clean raw paths)
//!     │
//!     ├── route (pure: files × patterns × options → Routes)
//!     │
//!     ├── Compiler (cw-compiler, swappable)
//!     │
//!     ├── ArtifactWriter (disk, skipped under noop)
//!     │
//!     └── Reporter (one start notice, one outcome)
//! ```
//!
//! Runs are synchronous and sequential; the host serializes batches.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod discover;
mod error;
mod inspector;
mod orchestrator;
mod pattern;
mod reporter;
mod router;
mod writer;

pub use discover::SourceWalker;
pub use error::RunnerError;
pub use inspector::{CleanOptions, Inspector};
pub use orchestrator::Orchestrator;
pub use pattern::{PatternMatch, WatchPattern, compile_patterns};
pub use reporter::{
    FAILURE_PRIORITY, NOTIFICATION_TITLE, Notification, NotificationImage, Reporter,
    TracingReporter,
};
pub use router::{Routes, RoutingDecision, route};
pub use writer::{ArtifactWriter, WrittenPaths};
