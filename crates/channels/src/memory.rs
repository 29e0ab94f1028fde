//! In-memory loopback gateway.
//!
//! Keeps every message in process, records each gateway call as a
//! [`GatewayOp`], and lets callers inject reactions and replies as if they
//! came from real users. Used by the test suites and for embedding the engine
//! without a platform.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reactkit_core::content::Content;
use reactkit_core::error::GatewayError;
use reactkit_core::gateway::{
    ChannelId, IncomingMessage, MessageFeed, MessageHandle, MessageId, MessagingGateway,
    ReactionEvent, ReactionFeed, SubscriptionId, User, UserId,
};
use tracing::debug;

use crate::hub::{SubscriberHub, fan_out};

/// One observable gateway call, in the order the gateway saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOp {
    Send {
        channel: ChannelId,
        message: MessageId,
        content: Content,
    },
    EditStarted {
        message: MessageId,
        content: Content,
    },
    EditFinished {
        message: MessageId,
    },
    AttachStarted {
        message: MessageId,
        emoji: String,
    },
    AttachFinished {
        message: MessageId,
        emoji: String,
    },
    RemoveReaction {
        message: MessageId,
        emoji: String,
        user: UserId,
    },
    ClearReactions {
        message: MessageId,
    },
    Subscribe {
        id: SubscriptionId,
    },
    Unsubscribe {
        id: SubscriptionId,
    },
}

struct StoredMessage {
    channel: ChannelId,
    content: Content,
    reactions: Vec<(String, UserId)>,
}

#[derive(Default)]
struct State {
    messages: HashMap<MessageId, StoredMessage>,
    closed_channels: HashSet<ChannelId>,
    failing_emojis: HashSet<String>,
    refuse_subscriptions: bool,
    hub: SubscriberHub,
    ops: Vec<GatewayOp>,
}

/// Loopback gateway backed by process memory.
pub struct MemoryGateway {
    account: User,
    latency: Duration,
    next_message: AtomicU64,
    state: Mutex<State>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            account: User::bot("reactkit"),
            latency: Duration::ZERO,
            next_message: AtomicU64::new(1),
            state: Mutex::new(State::default()),
        }
    }

    /// Delay every edit and attach by `latency` to expose ordering bugs.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The account the gateway posts and reacts as.
    pub fn account(&self) -> &User {
        &self.account
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make a channel unaddressable, as if it was deleted.
    pub fn close_channel(&self, channel: &ChannelId) {
        self.state().closed_channels.insert(channel.clone());
    }

    /// Make every future attach of `emoji` fail.
    pub fn fail_attach(&self, emoji: &str) {
        self.state().failing_emojis.insert(emoji.to_string());
    }

    /// Make every future reaction subscription fail.
    pub fn fail_subscribe(&self) {
        self.state().refuse_subscriptions = true;
    }

    /// End every live feed, as if the connection to the platform dropped.
    pub fn disconnect(&self) {
        self.state().hub.clear();
    }

    /// Add a user reaction and deliver it to subscribers of the message.
    ///
    /// Returns how many subscriptions received the event.
    pub async fn inject_reaction(
        &self,
        handle: &MessageHandle,
        emoji: &str,
        user: User,
    ) -> Result<usize, GatewayError> {
        let targets = {
            let mut state = self.state();
            let stored = state
                .messages
                .get_mut(&handle.id)
                .ok_or_else(|| GatewayError::MessageNotFound(handle.id.to_string()))?;
            stored.reactions.push((emoji.to_string(), user.id.clone()));
            state.hub.reaction_targets(&handle.id)
        };

        let event = ReactionEvent {
            message: handle.id.clone(),
            emoji: emoji.to_string(),
            user,
        };
        Ok(fan_out(targets, event).await)
    }

    /// Post a message as a user and deliver it to channel subscribers.
    pub async fn inject_message(
        &self,
        channel: &ChannelId,
        author: User,
        content: &str,
    ) -> Result<usize, GatewayError> {
        let id = self.allocate_id();
        let targets = {
            let mut state = self.state();
            if state.closed_channels.contains(channel) {
                return Err(GatewayError::ChannelUnavailable(channel.to_string()));
            }
            state.messages.insert(
                id.clone(),
                StoredMessage {
                    channel: channel.clone(),
                    content: Content::text(content),
                    reactions: vec![],
                },
            );
            state.hub.message_targets(channel)
        };

        let message = IncomingMessage {
            channel: channel.clone(),
            id,
            author,
            content: content.to_string(),
        };
        Ok(fan_out(targets, message).await)
    }

    /// Every recorded gateway call so far.
    pub fn ops(&self) -> Vec<GatewayOp> {
        self.state().ops.clone()
    }

    /// Contents posted with `send_message` into a channel, oldest first.
    pub fn sent_to(&self, channel: &ChannelId) -> Vec<Content> {
        self.state()
            .ops
            .iter()
            .filter_map(|op| match op {
                GatewayOp::Send {
                    channel: c, content, ..
                } if c == channel => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    /// Current content of a message.
    pub fn content_of(&self, message: &MessageId) -> Option<Content> {
        self.state().messages.get(message).map(|m| m.content.clone())
    }

    /// Emojis currently shown on a message, in the order they were added.
    pub fn reactions_on(&self, message: &MessageId) -> Vec<String> {
        self.state()
            .messages
            .get(message)
            .map(|m| m.reactions.iter().map(|(e, _)| e.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of completed edits of a message.
    pub fn edit_count(&self, message: &MessageId) -> usize {
        self.state()
            .ops
            .iter()
            .filter(|op| matches!(op, GatewayOp::EditFinished { message: m } if m == message))
            .count()
    }

    /// Number of live reaction and message subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.state().hub.len()
    }

    fn allocate_id(&self) -> MessageId {
        MessageId(format!("m{}", self.next_message.fetch_add(1, Ordering::SeqCst)))
    }

    fn check_reachable(&self, handle: &MessageHandle) -> Result<(), GatewayError> {
        let state = self.state();
        if state.closed_channels.contains(&handle.channel) {
            return Err(GatewayError::ChannelUnavailable(handle.channel.to_string()));
        }
        if !state.messages.contains_key(&handle.id) {
            return Err(GatewayError::MessageNotFound(handle.id.to_string()));
        }
        Ok(())
    }

    fn record(&self, op: GatewayOp) {
        self.state().ops.push(op);
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingGateway for MemoryGateway {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        content: &Content,
    ) -> Result<MessageHandle, GatewayError> {
        let id = self.allocate_id();
        let mut state = self.state();
        if state.closed_channels.contains(channel) {
            return Err(GatewayError::ChannelUnavailable(channel.to_string()));
        }
        state.messages.insert(
            id.clone(),
            StoredMessage {
                channel: channel.clone(),
                content: content.clone(),
                reactions: vec![],
            },
        );
        state.ops.push(GatewayOp::Send {
            channel: channel.clone(),
            message: id.clone(),
            content: content.clone(),
        });
        debug!(channel = %channel, message = %id, "Memory send");
        Ok(MessageHandle {
            channel: channel.clone(),
            id,
        })
    }

    async fn edit_message(
        &self,
        handle: &MessageHandle,
        content: &Content,
    ) -> Result<(), GatewayError> {
        self.check_reachable(handle)?;
        self.record(GatewayOp::EditStarted {
            message: handle.id.clone(),
            content: content.clone(),
        });
        self.simulate_latency().await;

        let mut state = self.state();
        let stored = state
            .messages
            .get_mut(&handle.id)
            .ok_or_else(|| GatewayError::MessageNotFound(handle.id.to_string()))?;
        stored.content = content.clone();
        state.ops.push(GatewayOp::EditFinished {
            message: handle.id.clone(),
        });
        Ok(())
    }

    async fn attach_reaction(
        &self,
        handle: &MessageHandle,
        emoji: &str,
    ) -> Result<(), GatewayError> {
        self.check_reachable(handle)?;
        self.record(GatewayOp::AttachStarted {
            message: handle.id.clone(),
            emoji: emoji.to_string(),
        });
        self.simulate_latency().await;

        let targets = {
            let mut state = self.state();
            if state.failing_emojis.contains(emoji) {
                return Err(GatewayError::DeliveryFailed {
                    gateway: "memory".into(),
                    reason: format!("unknown emoji {emoji}"),
                });
            }
            if let Some(stored) = state.messages.get_mut(&handle.id) {
                stored
                    .reactions
                    .push((emoji.to_string(), self.account.id.clone()));
            }
            state.ops.push(GatewayOp::AttachFinished {
                message: handle.id.clone(),
                emoji: emoji.to_string(),
            });
            state.hub.reaction_targets(&handle.id)
        };

        // Platforms echo the gateway's own reactions back to subscribers.
        let event = ReactionEvent {
            message: handle.id.clone(),
            emoji: emoji.to_string(),
            user: self.account.clone(),
        };
        fan_out(targets, event).await;
        Ok(())
    }

    async fn remove_reaction(
        &self,
        handle: &MessageHandle,
        emoji: &str,
        user: &UserId,
    ) -> Result<(), GatewayError> {
        self.check_reachable(handle)?;
        let mut state = self.state();
        if let Some(stored) = state.messages.get_mut(&handle.id) {
            if let Some(pos) = stored
                .reactions
                .iter()
                .position(|(e, u)| e == emoji && u == user)
            {
                stored.reactions.remove(pos);
            }
        }
        state.ops.push(GatewayOp::RemoveReaction {
            message: handle.id.clone(),
            emoji: emoji.to_string(),
            user: user.clone(),
        });
        Ok(())
    }

    async fn clear_reactions(&self, handle: &MessageHandle) -> Result<(), GatewayError> {
        self.check_reachable(handle)?;
        let mut state = self.state();
        if let Some(stored) = state.messages.get_mut(&handle.id) {
            stored.reactions.clear();
        }
        state.ops.push(GatewayOp::ClearReactions {
            message: handle.id.clone(),
        });
        Ok(())
    }

    async fn subscribe_reactions(
        &self,
        handle: &MessageHandle,
    ) -> Result<ReactionFeed, GatewayError> {
        self.check_reachable(handle)?;
        let mut state = self.state();
        if state.refuse_subscriptions {
            return Err(GatewayError::DeliveryFailed {
                gateway: "memory".into(),
                reason: "subscriptions refused".into(),
            });
        }
        let feed = state.hub.add_reaction_sub(&handle.id);
        state.ops.push(GatewayOp::Subscribe { id: feed.id });
        Ok(feed)
    }

    async fn subscribe_messages(&self, channel: &ChannelId) -> Result<MessageFeed, GatewayError> {
        let mut state = self.state();
        if state.closed_channels.contains(channel) {
            return Err(GatewayError::ChannelUnavailable(channel.to_string()));
        }
        let feed = state.hub.add_message_sub(channel);
        state.ops.push(GatewayOp::Subscribe { id: feed.id });
        Ok(feed)
    }

    async fn unsubscribe(&self, id: SubscriptionId) {
        let mut state = self.state();
        if state.hub.remove(id) {
            state.ops.push(GatewayOp::Unsubscribe { id });
        }
    }
}
