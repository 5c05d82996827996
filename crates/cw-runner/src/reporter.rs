//! Result reporting.
//!
//! The orchestrator produces exactly one start line and one outcome per run.
//! A [`Reporter`] receives those as log lines and as [`Notification`]s; how
//! they are shown (console, desktop notifier, test recorder) is up to the
//! implementation.

use serde::Serialize;
use tracing::{error, info};

/// Title carried by every notification.
pub const NOTIFICATION_TITLE: &str = "CoffeeScript results";

/// Priority given to failure notifications.
pub const FAILURE_PRIORITY: i8 = 2;

/// Image shown with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationImage {
    /// The run succeeded.
    Success,
    /// The run had errors.
    Failed,
}

/// A system notification for the outcome of a run.
///
/// # Examples
///
/// ```
/// use cw_runner::{Notification, NotificationImage};
///
/// let note = Notification::failure("a.coffee: unexpected ->");
/// assert_eq!(note.title, "CoffeeScript results");
/// assert_eq!(note.image, NotificationImage::Failed);
/// assert_eq!(note.priority, Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Body text.
    pub message: String,
    /// Title, always [`NOTIFICATION_TITLE`].
    pub title: String,
    /// Image to show.
    pub image: NotificationImage,
    /// Notifier priority, if raised.
    pub priority: Option<i8>,
}

impl Notification {
    /// Creates a success notification.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            title: NOTIFICATION_TITLE.to_owned(),
            image: NotificationImage::Success,
            priority: None,
        }
    }

    /// Creates a failure notification with raised priority.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            title: NOTIFICATION_TITLE.to_owned(),
            image: NotificationImage::Failed,
            priority: Some(FAILURE_PRIORITY),
        }
    }
}

/// Receives the messages a run produces.
pub trait Reporter {
    /// An informational line, such as the start notice.
    fn info(&self, message: &str);

    /// A success line.
    fn success(&self, message: &str);

    /// A failure line.
    fn error(&self, message: &str);

    /// A system notification.
    fn notify(&self, notification: &Notification);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn success(&self, message: &str) {
        (**self).success(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }

    fn notify(&self, notification: &Notification) {
        (**self).notify(notification);
    }
}

/// Reports through `tracing` events.
///
/// Notifications are emitted under the `coffeewatch::notify` target so a
/// subscriber can route them separately.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn success(&self, message: &str) {
        info!(outcome = "success", "{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }

    fn notify(&self, notification: &Notification) {
        match notification.image {
            NotificationImage::Success => info!(
                target: "coffeewatch::notify",
                title = %notification.title,
                "{}",
                notification.message
            ),
            NotificationImage::Failed => error!(
                target: "coffeewatch::notify",
                title = %notification.title,
                priority = notification.priority,
                "{}",
                notification.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_notification_shape() {
        let note = Notification::success("Successfully generated a.js");
        insta::assert_json_snapshot!(note, @r#"
        {
          "message": "Successfully generated a.js",
          "title": "CoffeeScript results",
          "image": "success",
          "priority": null
        }
        "#);
    }

    #[test]
    fn test_failure_notification_shape() {
        let note = Notification::failure("a.coffee: boom\nb.coffee: bang");
        assert_eq!(note.image, NotificationImage::Failed);
        assert_eq!(note.priority, Some(FAILURE_PRIORITY));
        assert_eq!(note.message, "a.coffee: boom\nb.coffee: bang");
    }

    #[test]
    fn test_tracing_reporter_does_not_panic_without_subscriber() {
        fn through<R: Reporter>(reporter: R) {
            reporter.notify(&Notification::success("ok"));
        }

        let reporter = TracingReporter;
        reporter.info("Compile a.coffee");
        reporter.success("Successfully generated a.js");
        reporter.error("a.coffee: boom");
        reporter.notify(&Notification::failure("a.coffee: boom"));
        through(&reporter);
    }
}
