//! File watcher with async event streaming.
//!
//! [`FileWatcher`] bridges the synchronous `notify` debouncer to tokio: the
//! debouncer runs on a blocking-pool thread, classifies and filters every
//! debounced path, and forwards [`FileEvent`]s over a bounded channel.
//!
//! ```text
//! spawn_blocking: notify ─► debouncer ─► classify + filter ─┐
//!                                                          │ blocking_send
//! tokio:          FileWatcher::recv / next_batch ◄─────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use cw_watcher::{FileWatcher, SourceFilter};
//! use cw_core::WatchConfig;
//! use camino::Utf8Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WatchConfig::default();
//!     let mut watcher =
//!         FileWatcher::new(Utf8Path::new("."), &config, SourceFilter::default()).await?;
//!
//!     while let Some(event) = watcher.recv().await {
//!         println!("{:?}: {}", event.kind, event.path);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use cw_core::WatchConfig;

use crate::error::WatchError;
use crate::events::{FileEvent, FileEventBatch};
use crate::filter::FileFilter;

/// Default channel capacity for file events.
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// A file watcher that streams classified events to an async context.
///
/// Dropping the watcher signals the background thread to stop; call
/// [`FileWatcher::shutdown`] to also wait for it.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use cw_watcher::{FileWatcher, SourceFilter};
/// use cw_core::WatchConfig;
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), cw_watcher::WatchError> {
/// let mut watcher = FileWatcher::new(
///     Utf8Path::new("./app"),
///     &WatchConfig::default(),
///     SourceFilter::default(),
/// ).await?;
///
/// while let Some(batch) = watcher.next_batch(Duration::from_millis(50)).await {
///     let paths = batch.split(watcher.watch_path());
///     println!("changed {:?}, removed {:?}", paths.changed, paths.removed);
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    /// Stops the blocking task. `None` once shutdown started.
    shutdown_tx: Option<oneshot::Sender<()>>,

    task_handle: Option<JoinHandle<Result<(), WatchError>>>,

    event_rx: mpsc::Receiver<FileEvent>,

    /// Canonical watch root.
    watch_path: Utf8PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watch_path", &self.watch_path)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Starts watching `path` with the default channel capacity.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist, or
    /// [`WatchError::Io`] if it cannot be canonicalized. Backend failures
    /// surface from [`FileWatcher::shutdown`].
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn new<F: FileFilter>(
        path: &Utf8Path,
        config: &WatchConfig,
        filter: F,
    ) -> Result<Self, WatchError> {
        Self::spawn(path, config, filter, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Starts watching `path` with a custom channel capacity.
    ///
    /// # Errors
    ///
    /// Same as [`FileWatcher::new`].
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn with_capacity<F: FileFilter>(
        path: &Utf8Path,
        config: &WatchConfig,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        Self::spawn(path, config, filter, channel_capacity.max(1))
    }

    fn spawn<F: FileFilter>(
        path: &Utf8Path,
        config: &WatchConfig,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }

        let canonical = path.as_std_path().canonicalize()?;
        let watch_path = Utf8PathBuf::from_path_buf(canonical).map_err(WatchError::non_utf8_path)?;

        let (event_tx, event_rx) = mpsc::channel(channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task_path = watch_path.clone();
        let debounce = Duration::from_millis(config.debounce_ms);
        let recursive = config.recursive;

        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(&task_path, debounce, recursive, event_tx, shutdown_rx, filter)
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            watch_path,
        })
    }

    /// Receives the next event.
    ///
    /// Returns `None` once the watcher thread has stopped.
    pub async fn recv(&mut self) -> Option<FileEvent> {
        self.event_rx.recv().await
    }

    /// Waits for an event, then gathers every further event that arrives
    /// within `settle` of the previous one.
    ///
    /// One debounce window can deliver several events back to back; this
    /// turns them into a single batch so the host runs one compile per
    /// burst. Returns `None` once the watcher thread has stopped.
    pub async fn next_batch(&mut self, settle: Duration) -> Option<FileEventBatch> {
        let first = self.event_rx.recv().await?;
        let mut batch = FileEventBatch::new();
        batch.push(first);

        while let Ok(Some(event)) = tokio::time::timeout(settle, self.event_rx.recv()).await {
            batch.push(event);
        }

        Some(batch)
    }

    /// Returns the event receiver, for use with `tokio::select!`.
    pub fn events(&mut self) -> &mut mpsc::Receiver<FileEvent> {
        &mut self.event_rx
    }

    /// Returns the canonical watch root.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns `true` while the background thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the watcher and waits for the background thread.
    ///
    /// # Errors
    ///
    /// Returns the backend error the thread stopped with, or
    /// [`WatchError::TaskFailed`] if it panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The thread may already be gone.
            let _ = tx.send(());
        }

        if let Some(handle) = self.task_handle.take() {
            handle.await.map_err(WatchError::task_failed)??;
        }

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Body of the blocking task: runs the debouncer until shutdown.
fn run_watcher_loop<F: FileFilter>(
    path: &Utf8Path,
    debounce: Duration,
    recursive: bool,
    event_tx: mpsc::Sender<FileEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    filter: F,
) -> Result<(), WatchError> {
    let mut debouncer: Debouncer<notify::RecommendedWatcher> =
        new_debouncer(debounce, move |res: DebounceEventResult| match res {
            Ok(events) => {
                for event in events {
                    let path = match Utf8PathBuf::try_from(event.path) {
                        Ok(p) => p,
                        Err(e) => {
                            tracing::warn!(
                                path = %e.into_path_buf().display(),
                                "Skipping non-UTF-8 path in file event"
                            );
                            continue;
                        }
                    };

                    if !filter.should_process(&path) {
                        tracing::trace!(path = %path, "Filtered out file event");
                        continue;
                    }

                    let file_event = FileEvent::classify(path);
                    tracing::debug!(path = %file_event.path, kind = ?file_event.kind, "File event");

                    if event_tx.blocking_send(file_event).is_err() {
                        tracing::debug!("Event channel closed, dropping remaining events");
                        break;
                    }
                }
            }
            Err(error) => tracing::warn!(error = %error, "Debouncer error"),
        })?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    debouncer.watcher().watch(path.as_std_path(), mode)?;

    tracing::info!(path = %path, recursive, "File watcher started");

    // Either a shutdown message or the sender being dropped ends the watch.
    let _ = shutdown_rx.blocking_recv();

    tracing::info!(path = %path, "File watcher stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeKind;
    use crate::filter::{AcceptAllFilter, SourceFilter};
    use std::fs;
    use tempfile::TempDir;

    fn fast_config() -> WatchConfig {
        WatchConfig {
            debounce_ms: 50,
            recursive: true,
        }
    }

    fn root(temp: &TempDir) -> &Utf8Path {
        Utf8Path::from_path(temp.path()).unwrap()
    }

    #[tokio::test]
    async fn test_watcher_starts_and_stops() {
        let temp = TempDir::new().unwrap();
        let watcher = FileWatcher::new(root(&temp), &WatchConfig::default(), AcceptAllFilter)
            .await
            .unwrap();

        assert!(watcher.is_running());
        assert!(watcher.watch_path().is_absolute());
        watcher.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_watcher_path_not_found() {
        let result = FileWatcher::new(
            Utf8Path::new("/nonexistent/coffeewatch/root"),
            &WatchConfig::default(),
            AcceptAllFilter,
        )
        .await;

        assert!(matches!(result, Err(WatchError::PathNotFound(_))));
    }

    #[tokio::test]
    async fn test_watcher_with_capacity() {
        let temp = TempDir::new().unwrap();
        let watcher = FileWatcher::with_capacity(root(&temp), &fast_config(), AcceptAllFilter, 0)
            .await
            .unwrap();
        assert!(watcher.is_running());
    }

    #[tokio::test]
    async fn test_watcher_reports_source_changes() {
        let temp = TempDir::new().unwrap();
        let mut watcher = FileWatcher::new(root(&temp), &fast_config(), SourceFilter::default())
            .await
            .unwrap();

        fs::write(temp.path().join("ignored.js"), "x").unwrap();
        fs::write(temp.path().join("a.coffee"), "a = 1").unwrap();

        let batch =
            tokio::time::timeout(Duration::from_secs(2), watcher.next_batch(Duration::from_millis(100)))
                .await;
        let watch_path = watcher.watch_path().to_path_buf();
        watcher.shutdown().await.unwrap();

        // Timing dependent; only assert on what arrived.
        if let Ok(Some(batch)) = batch {
            let paths = batch.split(&watch_path);
            assert!(paths.changed.iter().all(|p| p.as_str() == "a.coffee"));
            assert!(batch.iter().all(|e| e.kind == ChangeKind::Changed));
        }
    }

    #[tokio::test]
    async fn test_no_events_without_changes() {
        let temp = TempDir::new().unwrap();
        let mut watcher = FileWatcher::new(root(&temp), &fast_config(), SourceFilter::default())
            .await
            .unwrap();

        assert!(matches!(
            watcher.events().try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));
        assert!(watcher.events().is_empty());
    }
}
