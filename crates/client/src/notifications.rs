//! Ephemeral user-visible notifications (toasts).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::debug;

/// Lifetime of success, warning and info toasts.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);
/// Errors stay on screen longer.
pub const ERROR_DURATION: Duration = Duration::from_millis(5000);

const EVENT_CAPACITY: usize = 64;

/// Unique toast identifier, monotonic per [`NotificationCenter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToastId(u64);

impl ToastId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ToastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Duration used by the severity shortcuts.
    #[must_use]
    pub const fn default_duration(self) -> Duration {
        match self {
            Self::Error => ERROR_DURATION,
            Self::Success | Self::Warning | Self::Info => DEFAULT_DURATION,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub severity: Severity,
    /// When the toast removes itself; `None` means it stays until removed.
    pub expires_at: Option<Instant>,
}

/// Collection of live toasts with automatic expiry.
///
/// Cheap to clone; clones share the same toast list.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    toasts: watch::Sender<Vec<Toast>>,
    events: broadcast::Sender<Toast>,
    next_id: AtomicU64,
}

impl Inner {
    fn remove(&self, id: ToastId) -> bool {
        self.toasts.send_if_modified(|toasts| {
            let before = toasts.len();
            toasts.retain(|t| t.id != id);
            toasts.len() != before
        })
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                toasts: watch::Sender::new(Vec::new()),
                events,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Show a toast. A non-zero `duration` schedules its removal.
    ///
    /// Expiry needs a running tokio runtime; without one the toast stays
    /// until removed.
    pub fn add(&self, message: impl Into<String>, severity: Severity, duration: Duration) -> ToastId {
        let id = ToastId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let runtime = tokio::runtime::Handle::try_current().ok();
        let expires_at = (!duration.is_zero() && runtime.is_some()).then(|| Instant::now() + duration);

        let toast = Toast {
            id,
            message: message.into(),
            severity,
            expires_at,
        };
        debug!(%id, %severity, message = %toast.message, "Toast added");
        self.inner.toasts.send_modify(|toasts| toasts.push(toast.clone()));
        // No subscribers is fine
        let _ = self.inner.events.send(toast);

        if let (Some(runtime), Some(_)) = (runtime, expires_at) {
            let weak: Weak<Inner> = Arc::downgrade(&self.inner);
            runtime.spawn(async move {
                tokio::time::sleep(duration).await;
                if let Some(inner) = weak.upgrade() {
                    inner.remove(id);
                }
            });
        }
        id
    }

    /// Remove a toast. Unknown IDs are ignored.
    pub fn remove(&self, id: ToastId) -> bool {
        self.inner.remove(id)
    }

    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.add(message, Severity::Success, Severity::Success.default_duration())
    }

    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.add(message, Severity::Error, Severity::Error.default_duration())
    }

    pub fn warning(&self, message: impl Into<String>) -> ToastId {
        self.add(message, Severity::Warning, Severity::Warning.default_duration())
    }

    pub fn info(&self, message: impl Into<String>) -> ToastId {
        self.add(message, Severity::Info, Severity::Info.default_duration())
    }

    /// Currently visible toasts, oldest first.
    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.toasts.borrow().clone()
    }

    /// Observe the visible toast list.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Toast>> {
        self.inner.toasts.subscribe()
    }

    /// Receive every toast as it is created, including ones that have
    /// already expired from the visible list.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<Toast> {
        self.inner.events.subscribe()
    }
}
