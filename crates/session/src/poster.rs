//! Ordered emoji attachment.
//!
//! Platforms may reorder concurrent reaction attaches, so icons are attached
//! strictly one after another: each attach is acknowledged before the next
//! begins, and the first failure aborts the rest.

use std::sync::Arc;

use reactkit_core::error::SessionError;
use reactkit_core::gateway::{MessageHandle, MessagingGateway};
use tracing::{debug, warn};

/// Attaches a list of reaction icons to a message in list order.
#[derive(Clone)]
pub struct ReactionPoster {
    gateway: Arc<dyn MessagingGateway>,
}

impl ReactionPoster {
    pub fn new(gateway: Arc<dyn MessagingGateway>) -> Self {
        Self { gateway }
    }

    /// Attach every emoji, in order. Returns the number attached.
    ///
    /// Fails with [`SessionError::Attachment`] on the first failed attach;
    /// remaining emojis are not attempted.
    pub async fn attach_all<S: AsRef<str>>(
        &self,
        handle: &MessageHandle,
        emojis: &[S],
    ) -> Result<usize, SessionError> {
        let mut attached = 0;
        for emoji in emojis.iter().map(AsRef::as_ref) {
            if let Err(e) = self.gateway.attach_reaction(handle, emoji).await {
                warn!(
                    message = %handle.id,
                    emoji = %emoji,
                    attached,
                    error = %e,
                    "Reaction attach failed, aborting remaining"
                );
                return Err(SessionError::Attachment {
                    emoji: emoji.to_string(),
                    reason: e.to_string(),
                });
            }
            attached += 1;
        }
        debug!(message = %handle.id, attached, "Reactions attached");
        Ok(attached)
    }
}
