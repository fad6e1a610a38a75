//! Transient user-facing notices.
//!
//! Components report the outcome of user actions and timer ticks by posting a
//! [`Notice`] instead of returning errors. Front ends either subscribe to the
//! broadcast stream or poll [`NoticeBoard::current`], which hides a notice once
//! its lifetime has passed.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::Error;

/// Default number of buffered notices per subscriber.
pub const DEFAULT_NOTICE_CAPACITY: usize = 64;

/// Default time a notice stays visible.
pub const DEFAULT_NOTICE_LIFETIME: Duration = Duration::from_millis(2500);

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Ok,
    Error,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Ok,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receiver for notices.
pub type NoticeReceiver = broadcast::Receiver<Notice>;

/// Broadcasts notices and remembers the latest one.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    sender: broadcast::Sender<Notice>,
    latest: Arc<Mutex<Option<(Notice, Instant)>>>,
    lifetime: Duration,
}

impl NoticeBoard {
    /// Create a board buffering `capacity` notices, each visible for `lifetime`.
    pub fn new(capacity: usize, lifetime: Duration) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            latest: Arc::new(Mutex::new(None)),
            lifetime,
        }
    }

    /// Subscribe to notices.
    pub fn subscribe(&self) -> NoticeReceiver {
        self.sender.subscribe()
    }

    /// Post a notice.
    pub fn post(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Ok => info!(message = %notice.message, "Notice"),
            NoticeLevel::Error => warn!(message = %notice.message, "Notice"),
        }
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) =
            Some((notice.clone(), Instant::now()));
        // Ignore error if no receivers
        let _ = self.sender.send(notice);
    }

    /// Post a success notice.
    pub fn ok(&self, message: impl Into<String>) {
        self.post(Notice::ok(message));
    }

    /// Post an error notice.
    pub fn error(&self, message: impl Into<String>) {
        self.post(Notice::error(message));
    }

    /// Post an error notice carrying the error's message.
    pub fn failure(&self, err: &Error) {
        self.error(err.to_string());
    }

    /// The latest notice, if it is still within its lifetime.
    pub fn current(&self) -> Option<Notice> {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        latest
            .as_ref()
            .filter(|(_, posted)| posted.elapsed() < self.lifetime)
            .map(|(notice, _)| notice.clone())
    }

    /// How long a notice stays visible.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_CAPACITY, DEFAULT_NOTICE_LIFETIME)
    }
}
