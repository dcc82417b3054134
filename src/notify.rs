//! Render events and timed user notifications.
//!
//! Handlers never draw anything. They publish [`UiEvent`]s on a broadcast
//! channel and any presentation layer subscribes to it.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::session::view::{NavChrome, View};

/// Capacity of the event channel; slow subscribers lose the oldest events.
pub const EVENT_CAPACITY: usize = 256;

/// Form that owns an inline message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormId {
    Register,
    Confirm,
    Login,
    Upload,
    Request,
}

/// Style of an inline form message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
    Loading,
    Info,
    /// Remove whatever message the form shows
    Clear,
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub created: Instant,
}

/// Everything a renderer needs to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// The active view switched.
    ViewChanged { view: View, chrome: NavChrome },
    /// Session fields (identity, storage, files) changed.
    SessionUpdated,
    /// Inline message for a blocking form.
    FormMessage {
        form: FormId,
        kind: MessageKind,
        text: String,
    },
    /// A new notification was raised.
    Notice(Notice),
}

/// Keeps the currently visible notifications and expires them.
#[derive(Debug)]
pub struct Notifier {
    ttl: Duration,
    next_id: u64,
    active: VecDeque<Notice>,
    events: broadcast::Sender<UiEvent>,
}

impl Notifier {
    pub fn new(ttl: Duration, events: broadcast::Sender<UiEvent>) -> Self {
        Self {
            ttl,
            next_id: 0,
            active: VecDeque::new(),
            events,
        }
    }

    /// Raise a notification and return its id.
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        self.next_id += 1;
        let notice = Notice {
            id: self.next_id,
            level,
            message: message.into(),
            created: Instant::now(),
        };
        tracing::debug!(level = ?notice.level, message = %notice.message, "notice");
        let _ = self.events.send(UiEvent::Notice(notice.clone()));
        self.prune(notice.created);
        self.active.push_back(notice);
        self.next_id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Error, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Info, message)
    }

    /// Close a notification before it expires.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    /// Drop notifications older than the ttl.
    pub fn prune(&mut self, now: Instant) {
        while let Some(front) = self.active.front() {
            if now.saturating_duration_since(front.created) >= self.ttl {
                self.active.pop_front();
            } else {
                break;
            }
        }
    }

    /// Notifications still visible now.
    pub fn active(&mut self) -> Vec<Notice> {
        self.prune(Instant::now());
        self.active.iter().cloned().collect()
    }
}
