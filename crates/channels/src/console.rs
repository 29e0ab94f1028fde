//! Console gateway — interactive widgets in a terminal.
//!
//! Messages and edits are printed to stdout. Each stdin line is either a
//! reaction on the most recent decorated message or a plain reply:
//!
//! - `⏩`          reaction by the local user
//! - `@bob ⏩`     reaction by another user
//! - `bot:dj ⏩`   reaction by an automated account
//! - anything else is posted as a reply from that user

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reactkit_core::content::Content;
use reactkit_core::error::GatewayError;
use reactkit_core::gateway::{
    ChannelId, IncomingMessage, MessageFeed, MessageHandle, MessageId, MessagingGateway,
    ReactionEvent, ReactionFeed, SubscriptionId, User, UserId,
};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::hub::{SubscriberHub, fan_out};

#[derive(Default)]
struct ConsoleState {
    channel: Option<ChannelId>,
    decorated: Option<MessageId>,
    reactions: HashMap<MessageId, Vec<String>>,
    hub: SubscriberHub,
}

/// Terminal gateway for the interactive demo commands.
pub struct ConsoleGateway {
    local_user: User,
    next_message: AtomicU64,
    state: Arc<Mutex<ConsoleState>>,
}

/// A parsed stdin line.
#[derive(Debug, PartialEq, Eq)]
enum ConsoleInput {
    Reaction { user: User, emoji: String },
    Reply { user: User, text: String },
}

impl ConsoleGateway {
    pub fn new(local_user: impl Into<String>) -> Self {
        Self {
            local_user: User::human(local_user),
            next_message: AtomicU64::new(1),
            state: Arc::new(Mutex::new(ConsoleState::default())),
        }
    }

    pub fn local_user(&self) -> &User {
        &self.local_user
    }

    /// Start reading stdin and dispatching lines to subscribers.
    pub fn start_input(&self) -> tokio::task::JoinHandle<()> {
        let state = self.state.clone();
        let local_user = self.local_user.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        if matches!(line.as_str(), "exit" | "quit" | ":q") {
                            break;
                        }
                        dispatch(&state, &local_user, &line).await;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "stdin closed");
                        break;
                    }
                }
            }
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ConsoleState> {
        lock(&self.state)
    }

    fn allocate_id(&self) -> MessageId {
        MessageId(format!("m{}", self.next_message.fetch_add(1, Ordering::SeqCst)))
    }
}

fn lock(state: &Mutex<ConsoleState>) -> std::sync::MutexGuard<'_, ConsoleState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn parse_line(line: &str, local_user: &User, known_emojis: &[String]) -> ConsoleInput {
    let (user, rest) = if let Some(stripped) = line.strip_prefix('@') {
        let (name, rest) = stripped.split_once(' ').unwrap_or((stripped, ""));
        (User::human(name), rest.trim())
    } else if let Some(stripped) = line.strip_prefix("bot:") {
        let (name, rest) = stripped.split_once(' ').unwrap_or((stripped, ""));
        (User::bot(name), rest.trim())
    } else {
        (local_user.clone(), line)
    };

    if known_emojis.iter().any(|e| e == rest) {
        ConsoleInput::Reaction {
            user,
            emoji: rest.to_string(),
        }
    } else {
        ConsoleInput::Reply {
            user,
            text: rest.to_string(),
        }
    }
}

async fn dispatch(state: &Mutex<ConsoleState>, local_user: &User, line: &str) {
    let (input, decorated, channel) = {
        let state = lock(state);
        let known = state
            .decorated
            .as_ref()
            .and_then(|m| state.reactions.get(m))
            .cloned()
            .unwrap_or_default();
        (
            parse_line(line, local_user, &known),
            state.decorated.clone(),
            state.channel.clone(),
        )
    };

    match input {
        ConsoleInput::Reaction { user, emoji } => {
            let Some(message) = decorated else { return };
            let targets = lock(state).hub.reaction_targets(&message);
            let event = ReactionEvent {
                message,
                emoji,
                user,
            };
            fan_out(targets, event).await;
        }
        ConsoleInput::Reply { user, text } => {
            let Some(channel) = channel else { return };
            let targets = lock(state).hub.message_targets(&channel);
            let message = IncomingMessage {
                channel,
                id: MessageId(format!("in-{}", NEXT_REPLY.fetch_add(1, Ordering::SeqCst))),
                author: user,
                content: text,
            };
            fan_out(targets, message).await;
        }
    }
}

static NEXT_REPLY: AtomicU64 = AtomicU64::new(1);

#[async_trait]
impl MessagingGateway for ConsoleGateway {
    fn name(&self) -> &str {
        "console"
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        content: &Content,
    ) -> Result<MessageHandle, GatewayError> {
        let id = self.allocate_id();
        self.state().channel = Some(channel.clone());
        println!("[{channel}#{id}] {}", content.as_plain_text());
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
        println!("[{}#{} edited] {}", handle.channel, handle.id, content.as_plain_text());
        Ok(())
    }

    async fn attach_reaction(
        &self,
        handle: &MessageHandle,
        emoji: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.decorated = Some(handle.id.clone());
        let shown = state.reactions.entry(handle.id.clone()).or_default();
        shown.push(emoji.to_string());
        println!("[{}#{}] reactions: {}", handle.channel, handle.id, shown.join(" "));
        Ok(())
    }

    async fn remove_reaction(
        &self,
        handle: &MessageHandle,
        emoji: &str,
        user: &UserId,
    ) -> Result<(), GatewayError> {
        println!("[{}#{}] removed {emoji} from {user}", handle.channel, handle.id);
        Ok(())
    }

    async fn clear_reactions(&self, handle: &MessageHandle) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.reactions.remove(&handle.id);
        if state.decorated.as_ref() == Some(&handle.id) {
            state.decorated = None;
        }
        println!("[{}#{}] reactions cleared", handle.channel, handle.id);
        Ok(())
    }

    async fn subscribe_reactions(
        &self,
        handle: &MessageHandle,
    ) -> Result<ReactionFeed, GatewayError> {
        Ok(self.state().hub.add_reaction_sub(&handle.id))
    }

    async fn subscribe_messages(&self, channel: &ChannelId) -> Result<MessageFeed, GatewayError> {
        Ok(self.state().hub.add_message_sub(channel))
    }

    async fn unsubscribe(&self, id: SubscriptionId) {
        self.state().hub.remove(id);
    }
}
