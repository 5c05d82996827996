//! Debounced watching of CoffeeScript sources.
//!
//! This crate detects source changes with `notify`, debounced through
//! `notify-debouncer-mini`, and streams them into tokio. Each event is
//! classified as a change or a removal so the host can drive the runner's
//! compile and clean paths.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                 Blocking Thread (spawn_blocking)              │
//! │  RecommendedWatcher ─► Debouncer ─► SourceFilter + classify   │
//! └──────────────────────────────────────────────┬────────────────┘
//!                                                │ blocking_send
//!                                                ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Async Runtime (tokio)                     │
//! │  FileWatcher::next_batch ─► FileEventBatch::split ─► runner   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! cw-cli ──► cw-runner ──► cw-compiler ──► cw-core
//!        └─► cw-watcher ─────────────────────►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use cw_watcher::{FileWatcher, SourceFilter};
//! use cw_core::WatchConfig;
//! use camino::Utf8Path;
//!
//! # async fn example() -> Result<(), cw_watcher::WatchError> {
//! let mut watcher = FileWatcher::new(
//!     Utf8Path::new("."),
//!     &WatchConfig::default(),
//!     SourceFilter::default().exclude_dir("vendor"),
//! ).await?;
//!
//! while let Some(batch) = watcher.next_batch(Duration::from_millis(50)).await {
//!     let paths = batch.split(watcher.watch_path());
//!     // compile `paths.changed`, clean up after `paths.removed`
//! #   let _ = paths;
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod watcher;

pub use error::WatchError;
pub use events::{BatchPaths, ChangeKind, EventBatchStats, FileEvent, FileEventBatch};
pub use filter::{DEFAULT_EXCLUDED_DIRS, FileFilter, SourceFilter};
pub use watcher::FileWatcher;
