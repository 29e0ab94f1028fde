//! Session event system — observe the engine without coupling to it.
//!
//! Events are published whenever a session changes state. Tests, the CLI,
//! and metrics sinks subscribe and filter for what they care about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::gateway::MessageId;

/// Which widget a session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Paged,
    Rating,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paged => write!(f, "paged"),
            Self::Rating => write!(f, "rating"),
        }
    }
}

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// A control subscription reached its time limit
    Expired,
    /// A terminal flag vote was cast
    Flagged,
    /// Explicitly stopped by the caller
    Stopped,
}

/// All session events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A widget was rendered, decorated, and is accepting reactions
    Opened {
        anchor: MessageId,
        kind: SessionKind,
        timestamp: DateTime<Utc>,
    },

    /// A paged session moved to a new page and re-rendered
    Navigated {
        anchor: MessageId,
        cursor: usize,
        timestamp: DateTime<Utc>,
    },

    /// A vote was accepted and the subject re-rendered
    Rated {
        anchor: MessageId,
        rating: i64,
        delta: i64,
        timestamp: DateTime<Utc>,
    },

    /// The scoring callback rejected a vote; the session stays active
    VoteFailed {
        anchor: MessageId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The session was torn down
    Closed {
        anchor: MessageId,
        reason: CloseReason,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// The message the event concerns.
    pub fn anchor(&self) -> &MessageId {
        match self {
            Self::Opened { anchor, .. }
            | Self::Navigated { anchor, .. }
            | Self::Rated { anchor, .. }
            | Self::VoteFailed { anchor, .. }
            | Self::Closed { anchor, .. } => anchor,
        }
    }
}

/// A broadcast-based event bus for session events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<SessionEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SessionEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
