//! Transient, user-visible notices.
//!
//! Every component that can fail receives an `Arc<dyn Notifier>` and
//! publishes a [`Notice`] instead of surfacing its own banner. Notices are
//! never persisted; a subscriber that is not listening simply misses them.
//!
//! [`NotificationHub`] is the default implementation: a
//! `tokio::sync::broadcast` channel that any number of subscribers can
//! attach to, with every notice also echoed to `tracing`.
//!
//! # Example
//!
//! ```rust
//! use docproc_history::{Notice, NotificationHub, Notifier};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let hub = NotificationHub::new();
//! let mut rx = hub.subscribe();
//! hub.notify(Notice::success("Item deleted successfully."));
//! assert_eq!(rx.recv().await.unwrap().message, "Item deleted successfully.");
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Severity of a notice; drives colour in front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// One transient message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Receives notices from the aggregators, preview renderer and item actions.
///
/// Implementations must be `Send + Sync`: notices can be published from
/// concurrently running requests.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Drops every notice. Useful when the caller inspects return values only.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notice: Notice) {}
}

/// Convenience alias for the shared notifier handle.
pub type SharedNotifier = Arc<dyn Notifier>;

/// Default notice capacity per subscriber before old notices are dropped.
const HUB_CAPACITY: usize = 64;

/// Publish/subscribe notifier backed by a broadcast channel.
#[derive(Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<Notice>,
}

impl NotificationHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx }
    }

    /// Attach a new subscriber. It only sees notices published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationHub {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => warn!(notice = %notice.message, "notice"),
            _ => info!(notice = %notice.message, "notice"),
        }
        // No subscribers is not an error: notices are fire-and-forget.
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<Notice>>,
    }

    impl Notifier for Recording {
        fn notify(&self, notice: Notice) {
            self.seen.lock().unwrap().push(notice);
        }
    }

    #[test]
    fn noop_does_not_panic() {
        let n = NoopNotifier;
        n.notify(Notice::error("boom"));
        n.notify(Notice::success("ok"));
    }

    #[test]
    fn arc_dyn_notifier_works() {
        let rec = Arc::new(Recording::default());
        let shared: SharedNotifier = rec.clone();
        shared.notify(Notice::info("No More History"));
        shared.notify(Notice::error("Error deleting item. Please try again later."));

        let seen = rec.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].level, NoticeLevel::Info);
        assert_eq!(seen[1].level, NoticeLevel::Error);
    }

    #[test]
    fn hub_without_subscribers_is_silent() {
        let hub = NotificationHub::new();
        assert_eq!(hub.subscriber_count(), 0);
        hub.notify(Notice::success("nobody listening"));
    }

    #[tokio::test]
    async fn hub_fans_out_to_every_subscriber() {
        let hub = NotificationHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.notify(Notice::success("Item deleted successfully."));

        assert_eq!(a.recv().await.unwrap().level, NoticeLevel::Success);
        assert_eq!(
            b.recv().await.unwrap().message,
            "Item deleted successfully."
        );
    }
}
