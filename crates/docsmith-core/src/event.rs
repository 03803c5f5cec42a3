//! Event bus for docsmith using tokio::broadcast
//!
//! Views subscribe for redraw triggers and user notices.

use crate::models::{Plan, ProjectId};
use crate::session::UserId;
use tokio::sync::broadcast;

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient message meant for the user (a toast in the web dashboard)
#[derive(Debug, Clone, PartialEq, Eq)]
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

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Events emitted by the state core
#[derive(Debug, Clone)]
pub enum StateEvent {
    /// A user's snapshots were loaded (or seeded)
    SessionLoaded(UserId),
    /// The active session was torn down
    SessionClosed(UserId),
    ProjectCreated(ProjectId),
    ProjectUpdated(ProjectId),
    ProjectDeleted(ProjectId),
    /// Usage counters changed
    UsageChanged,
    PlanChanged { from: Plan, to: Plan },
    /// A generation job committed its project
    GenerationCompleted(ProjectId),
    Notice(Notice),
}

/// Event bus for broadcasting state events
pub struct EventBus {
    sender: broadcast::Sender<StateEvent>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create with default capacity (256 events)
    pub fn default_capacity() -> Self {
        Self::new(256)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: StateEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    pub fn notify(&self, notice: Notice) {
        self.publish(StateEvent::Notice(notice));
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.sender.subscribe()
    }

    /// Get current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::default_capacity()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
