//! Single-shot reply collection for follow-up commands.
//!
//! After a command asks a question ("pick a result 1-5"), the next matching
//! plain-text message in the channel is the answer. Nobody answering in time
//! produces a failure note in the conversation as well as an error.

use std::sync::Arc;
use std::time::Duration;

use reactkit_config::ReplyConfig;
use reactkit_core::error::{GatewayError, SessionError};
use reactkit_core::filter::MessageFilter;
use reactkit_core::gateway::{ChannelId, IncomingMessage, MessagingGateway};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::note::{NoteEmitter, NoteKind};

pub struct FollowUpCollector {
    gateway: Arc<dyn MessagingGateway>,
    notes: NoteEmitter,
    config: ReplyConfig,
}

impl FollowUpCollector {
    pub fn new(gateway: Arc<dyn MessagingGateway>, notes: NoteEmitter, config: ReplyConfig) -> Self {
        Self {
            gateway,
            notes,
            config,
        }
    }

    /// Wait for a matching reply using the configured timeout.
    pub async fn await_reply(
        &self,
        channel: &ChannelId,
        filter: &MessageFilter,
    ) -> Result<IncomingMessage, SessionError> {
        self.await_next_message(channel, filter, self.config.timeout())
            .await
    }

    /// Wait for the next message in `channel` that passes `filter`.
    pub async fn await_next_message(
        &self,
        channel: &ChannelId,
        filter: &MessageFilter,
        timeout: Duration,
    ) -> Result<IncomingMessage, SessionError> {
        let mut feed = self.gateway.subscribe_messages(channel).await?;
        let deadline = Instant::now() + timeout;

        let outcome = loop {
            match tokio::time::timeout_at(deadline, feed.messages.recv()).await {
                Ok(Some(message)) if filter.matches(&message) => break Ok(message),
                Ok(Some(message)) => {
                    debug!(author = %message.author.id, "Reply filtered out");
                }
                Ok(None) => {
                    break Err(SessionError::Gateway(GatewayError::ConnectionLost(
                        "message feed closed".into(),
                    )));
                }
                Err(_) => {
                    break Err(SessionError::Timeout {
                        what: "a reply".into(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
            }
        };

        self.gateway.unsubscribe(feed.id).await;

        match &outcome {
            Err(SessionError::Timeout { .. }) => {
                self.notes
                    .emit(channel, &self.config.timeout_note, NoteKind::Fail)
                    .await;
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "Stopped waiting for a reply");
                self.notes
                    .fail(channel, &format!("Stopped waiting for a reply: {e}"))
                    .await;
            }
            Ok(_) => {}
        }
        outcome
    }
}
