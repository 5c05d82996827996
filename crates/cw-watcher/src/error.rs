//! Error types for the cw-watcher crate.

use camino::Utf8PathBuf;

/// Errors raised while setting up or tearing down a watch.
///
/// Per-event problems (a non-UTF-8 path, a debouncer hiccup) are logged and
/// skipped inside the watcher thread; only [`WatchError::NonUtf8Path`] of
/// those is ever surfaced, and it is recoverable.
///
/// # Examples
///
/// ```
/// use cw_watcher::WatchError;
///
/// let err = WatchError::path_not_found("app/coffeescripts");
/// assert!(err.is_fatal());
/// assert_eq!(err.to_string(), "watch root does not exist: app/coffeescripts");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The notify backend failed to start or to register the root.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The watch root does not exist.
    #[error("watch root does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The watch root canonicalized to a non-UTF-8 path.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// The background watcher task panicked or was cancelled.
    #[error("watcher task ended abnormally: {0}")]
    TaskFailed(String),

    /// Canonicalizing the watch root failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Creates a new [`WatchError::TaskFailed`] error.
    #[inline]
    pub fn task_failed(reason: impl std::fmt::Display) -> Self {
        Self::TaskFailed(reason.to_string())
    }

    /// Returns `true` if watching can continue after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if watching must stop.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) => Some(path),
            Self::Notify(_) | Self::NonUtf8Path(_) | Self::TaskFailed(_) | Self::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_path_not_found() {
        let err = WatchError::path_not_found("src/missing");
        assert!(err.is_fatal());
        assert_eq!(err.path().map(|p| p.as_str()), Some("src/missing"));
    }

    #[test]
    fn test_non_utf8_is_recoverable() {
        let err = WatchError::non_utf8_path(PathBuf::from("odd"));
        assert!(err.is_recoverable());
        assert!(err.path().is_none());
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_task_failed() {
        let err = WatchError::task_failed("task 7 panicked");
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "watcher task ended abnormally: task 7 panicked");
    }

    #[test]
    fn test_io_from() {
        let err: WatchError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("I/O error"));
    }
}
