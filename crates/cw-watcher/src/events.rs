//! Event types for file change notifications.
//!
//! The debouncer reports paths, not operations. Each debounced path is
//! classified when the event is built: a path that no longer exists is a
//! removal, anything else a change.
//!
//! # Event Flow
//!
//! ```text
//! File System Change
//!        │
//!        ▼
//! notify-debouncer-mini (debounce window)
//!        │
//!        ▼
//!   FileEvent::classify (exists? → Changed : Removed)
//!        │
//!        ▼
//!   Sent via channel, batched by the host
//! ```

use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use cw_core::is_source_file;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Created or modified.
    Changed,
    /// Deleted (or renamed away).
    Removed,
}

/// A debounced file change.
///
/// # Examples
///
/// ```
/// use cw_watcher::{ChangeKind, FileEvent};
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::removed(Utf8PathBuf::from("app/a.coffee"));
/// assert_eq!(event.kind, ChangeKind::Removed);
/// assert!(event.is_source());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// The path of the file, as reported by the watcher (absolute).
    pub path: Utf8PathBuf,

    /// Whether the file changed or went away.
    pub kind: ChangeKind,

    /// When the event was received.
    pub timestamp: Instant,
}

impl FileEvent {
    /// Creates an event of the given kind, stamped now.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, kind: ChangeKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Creates a [`ChangeKind::Changed`] event.
    #[inline]
    #[must_use]
    pub fn changed(path: Utf8PathBuf) -> Self {
        Self::new(path, ChangeKind::Changed)
    }

    /// Creates a [`ChangeKind::Removed`] event.
    #[inline]
    #[must_use]
    pub fn removed(path: Utf8PathBuf) -> Self {
        Self::new(path, ChangeKind::Removed)
    }

    /// Classifies `path` by whether it still exists.
    #[must_use]
    pub fn classify(path: Utf8PathBuf) -> Self {
        if path.exists() {
            Self::changed(path)
        } else {
            Self::removed(path)
        }
    }

    /// Returns `true` if the path has a CoffeeScript source suffix.
    #[inline]
    #[must_use]
    pub fn is_source(&self) -> bool {
        is_source_file(&self.path)
    }

    /// Returns `true` for removals.
    #[inline]
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.kind == ChangeKind::Removed
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// Paths from a batch, split by what happened to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPaths {
    /// Paths to compile.
    pub changed: Vec<Utf8PathBuf>,
    /// Paths whose artifacts should be removed.
    pub removed: Vec<Utf8PathBuf>,
}

/// Events collected over one quiet period.
///
/// Uses [`SmallVec`] with inline storage for up to 8 events; a save usually
/// touches one or two files.
///
/// # Examples
///
/// ```
/// use cw_watcher::{FileEvent, FileEventBatch};
/// use camino::{Utf8Path, Utf8PathBuf};
///
/// let mut batch = FileEventBatch::new();
/// batch.push(FileEvent::changed(Utf8PathBuf::from("/proj/app/a.coffee")));
/// batch.push(FileEvent::removed(Utf8PathBuf::from("/proj/app/b.coffee")));
///
/// let paths = batch.split(Utf8Path::new("/proj"));
/// assert_eq!(paths.changed, [Utf8PathBuf::from("app/a.coffee")]);
/// assert_eq!(paths.removed, [Utf8PathBuf::from("app/b.coffee")]);
/// ```
#[derive(Debug, Clone)]
pub struct FileEventBatch {
    /// The events in arrival order.
    pub events: SmallVec<[FileEvent; 8]>,

    /// When the batch was started.
    pub received_at: Instant,
}

impl FileEventBatch {
    /// Creates an empty batch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: SmallVec::new(),
            received_at: Instant::now(),
        }
    }

    /// Adds an event.
    #[inline]
    pub fn push(&mut self, event: FileEvent) {
        self.events.push(event);
    }

    /// Returns the number of events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the batch has no events.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns an iterator over the events.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FileEvent> {
        self.events.iter()
    }

    /// Splits the batch into changed and removed paths relative to `root`.
    ///
    /// A path reported several times counts once, with its latest kind, at
    /// the position it was first seen. Paths outside `root` are kept as
    /// reported.
    #[must_use]
    pub fn split(&self, root: &Utf8Path) -> BatchPaths {
        let mut order: Vec<&Utf8Path> = Vec::new();
        let mut latest: FxHashMap<&Utf8Path, ChangeKind> = FxHashMap::default();

        for event in &self.events {
            if latest.insert(&event.path, event.kind).is_none() {
                order.push(&event.path);
            }
        }

        let mut paths = BatchPaths::default();
        for path in order {
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            match latest.get(path) {
                Some(ChangeKind::Removed) => paths.removed.push(relative),
                Some(ChangeKind::Changed) | None => paths.changed.push(relative),
            }
        }
        paths
    }
}

impl Default for FileEventBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoIterator for FileEventBatch {
    type Item = FileEvent;
    type IntoIter = smallvec::IntoIter<[FileEvent; 8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileEventBatch {
    type Item = &'a FileEvent;
    type IntoIter = std::slice::Iter<'a, FileEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl FromIterator<FileEvent> for FileEventBatch {
    fn from_iter<T: IntoIterator<Item = FileEvent>>(iter: T) -> Self {
        Self {
            events: iter.into_iter().collect(),
            received_at: Instant::now(),
        }
    }
}

/// Counts for a batch, logged by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatchStats {
    /// Total number of events.
    pub total_events: usize,

    /// Number of events on CoffeeScript sources.
    pub source_events: usize,

    /// Number of removals.
    pub removals: usize,
}

impl EventBatchStats {
    /// Computes statistics for a batch.
    #[must_use]
    pub fn from_batch(batch: &FileEventBatch) -> Self {
        Self {
            total_events: batch.len(),
            source_events: batch.iter().filter(|e| e.is_source()).count(),
            removals: batch.iter().filter(|e| e.is_removal()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_existing_and_missing() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap();
        let present = root.join("a.coffee");
        std::fs::write(&present, "a = 1").unwrap();

        assert_eq!(FileEvent::classify(present).kind, ChangeKind::Changed);
        assert_eq!(
            FileEvent::classify(root.join("gone.coffee")).kind,
            ChangeKind::Removed
        );
    }

    #[test]
    fn test_is_source() {
        assert!(FileEvent::changed("src/a.coffee".into()).is_source());
        assert!(FileEvent::changed("src/a.coffee.md".into()).is_source());
        assert!(!FileEvent::changed("src/a.js".into()).is_source());
    }

    #[test]
    fn test_file_name() {
        let event = FileEvent::changed("app/coffeescripts/x/a.litcoffee".into());
        assert_eq!(event.file_name(), Some("a.litcoffee"));
    }

    #[test]
    fn test_split_keeps_latest_kind_in_first_seen_order() {
        let batch: FileEventBatch = [
            FileEvent::changed("/p/b.coffee".into()),
            FileEvent::changed("/p/a.coffee".into()),
            FileEvent::removed("/p/b.coffee".into()),
            FileEvent::changed("/p/c.coffee".into()),
            FileEvent::changed("/p/a.coffee".into()),
        ]
        .into_iter()
        .collect();

        let paths = batch.split(Utf8Path::new("/p"));
        assert_eq!(paths.changed, ["a.coffee", "c.coffee"]);
        assert_eq!(paths.removed, ["b.coffee"]);
    }

    #[test]
    fn test_split_keeps_paths_outside_root() {
        let mut batch = FileEventBatch::new();
        batch.push(FileEvent::changed("/elsewhere/a.coffee".into()));

        let paths = batch.split(Utf8Path::new("/p"));
        assert_eq!(paths.changed, ["/elsewhere/a.coffee"]);
        assert!(paths.removed.is_empty());
    }

    #[test]
    fn test_batch_basics() {
        let mut batch = FileEventBatch::default();
        assert!(batch.is_empty());
        batch.push(FileEvent::changed("a.coffee".into()));
        batch.push(FileEvent::removed("b.coffee".into()));
        assert_eq!(batch.len(), 2);

        let names: Vec<_> = (&batch).into_iter().filter_map(FileEvent::file_name).collect();
        assert_eq!(names, ["a.coffee", "b.coffee"]);
        assert_eq!(batch.into_iter().count(), 2);
    }

    #[test]
    fn test_event_batch_stats() {
        let batch: FileEventBatch = [
            FileEvent::changed("a.coffee".into()),
            FileEvent::removed("b.litcoffee".into()),
            FileEvent::changed("c.js".into()),
        ]
        .into_iter()
        .collect();

        let stats = EventBatchStats::from_batch(&batch);
        insta::assert_json_snapshot!(stats, @r#"
        {
          "total_events": 3,
          "source_events": 2,
          "removals": 1
        }
        "#);
    }
}
