//! MessagingGateway trait — the abstraction over chat platforms.
//!
//! A gateway connects reactkit to a messaging platform (Discord, a terminal,
//! an in-process loopback, etc.). It sends and edits messages, manages
//! reaction icons, and exposes raw reaction/message feeds. Filtering and
//! time limits are layered on top by the session engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::content::Content;
use crate::error::GatewayError;

/// Identifier of a conversation that can receive messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

/// Platform-specific message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Platform-specific user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

macro_rules! display_newtype {
    ($($ty:ty),*) => {
        $(impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        })*
    };
}

display_newtype!(ChannelId, MessageId, UserId);

/// An account acting on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Human-readable name (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Automated accounts never count as voters.
    #[serde(default)]
    pub is_bot: bool,
}

impl User {
    pub fn human(id: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            name: None,
            is_bot: false,
        }
    }

    pub fn bot(id: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            name: None,
            is_bot: true,
        }
    }
}

/// Handle to a message previously sent through a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle {
    pub channel: ChannelId,
    pub id: MessageId,
}

/// A single reaction added to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub message: MessageId,
    pub emoji: String,
    pub user: User,
}

/// A plain message posted in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub channel: ChannelId,
    pub id: MessageId,
    pub author: User,
    pub content: String,
}

/// Identifier of a raw gateway subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Raw, unfiltered stream of reactions on one message.
#[derive(Debug)]
pub struct ReactionFeed {
    pub id: SubscriptionId,
    pub events: mpsc::Receiver<ReactionEvent>,
}

/// Raw, unfiltered stream of messages posted in one channel.
#[derive(Debug)]
pub struct MessageFeed {
    pub id: SubscriptionId,
    pub messages: mpsc::Receiver<IncomingMessage>,
}

/// The core gateway trait.
///
/// Implementations handle platform-specific connection logic, rendering,
/// rate limiting, and authentication. Every call completes only once the
/// platform acknowledged it.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Human-readable gateway name (e.g., "discord", "console", "memory").
    fn name(&self) -> &str;

    /// Post a new message. Fails with `ChannelUnavailable` if the channel is gone.
    async fn send_message(
        &self,
        channel: &ChannelId,
        content: &Content,
    ) -> Result<MessageHandle, GatewayError>;

    /// Replace the content of an existing message.
    async fn edit_message(&self, handle: &MessageHandle, content: &Content)
    -> Result<(), GatewayError>;

    /// Add a reaction icon to a message as the gateway's own account.
    async fn attach_reaction(&self, handle: &MessageHandle, emoji: &str)
    -> Result<(), GatewayError>;

    /// Remove one user's reaction from a message.
    async fn remove_reaction(
        &self,
        handle: &MessageHandle,
        emoji: &str,
        user: &UserId,
    ) -> Result<(), GatewayError>;

    /// Strip every reaction icon from a message.
    async fn clear_reactions(&self, handle: &MessageHandle) -> Result<(), GatewayError>;

    /// Start receiving every reaction added to a message.
    async fn subscribe_reactions(&self, handle: &MessageHandle)
    -> Result<ReactionFeed, GatewayError>;

    /// Start receiving every message posted in a channel.
    async fn subscribe_messages(&self, channel: &ChannelId) -> Result<MessageFeed, GatewayError>;

    /// Stop a reaction or message subscription. Unknown ids are ignored.
    async fn unsubscribe(&self, id: SubscriptionId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_constructors() {
        let human = User::human("u1");
        assert!(!human.is_bot);
        assert_eq!(human.id.to_string(), "u1");

        let bot = User::bot("b1");
        assert!(bot.is_bot);
    }

    #[test]
    fn reaction_event_serialization() {
        let event = ReactionEvent {
            message: MessageId("m1".into()),
            emoji: "👍".into(),
            user: User::human("u1"),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("👍"));
        let parsed: ReactionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn subscription_id_display() {
        assert_eq!(SubscriptionId(7).to_string(), "sub-7");
    }
}
