//! The user-facing notification sink.
//!
//! The orchestrators never render anything. They hand terminal outcomes to an
//! injected [`Notifier`], which the host application implements with whatever
//! it uses to show messages.

use std::fmt;

/// The kind of message being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// The operation succeeded.
    Success,
    /// The operation failed.
    Error,
    /// A field-scoped validation message.
    Warning,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
        })
    }
}

/// Shows outcomes to a human.
///
/// # Examples
///
/// ```
/// use steadycall::{NotificationKind, Notifier};
///
/// struct Stderr;
///
/// impl Notifier for Stderr {
///     fn notify(&self, kind: NotificationKind, title: &str, description: Option<&str>) {
///         eprintln!("[{kind}] {title} {}", description.unwrap_or_default());
///     }
/// }
/// ```
pub trait Notifier: Send + Sync {
    /// Presents one message.
    fn notify(&self, kind: NotificationKind, title: &str, description: Option<&str>);
}

/// A notifier that writes every message to `tracing`.
///
/// Useful for services and command line tools where there is no toast to
/// show. Success goes to `info`, warnings to `warn`, errors to `error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, description: Option<&str>) {
        let description = description.unwrap_or_default();
        match kind {
            NotificationKind::Success => tracing::info!(%kind, description, "{}", title),
            NotificationKind::Warning => tracing::warn!(%kind, description, "{}", title),
            NotificationKind::Error => tracing::error!(%kind, description, "{}", title),
        }
    }
}
