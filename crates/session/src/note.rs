//! Single-line status notes.

use std::sync::Arc;

use reactkit_config::NoteConfig;
use reactkit_core::content::Content;
use reactkit_core::gateway::{ChannelId, MessagingGateway};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Info,
    Music,
    Search,
    Fail,
}

/// Stateless formatter that posts one glyph-prefixed message per line.
#[derive(Clone)]
pub struct NoteEmitter {
    gateway: Arc<dyn MessagingGateway>,
    glyphs: NoteConfig,
}

impl NoteEmitter {
    pub fn new(gateway: Arc<dyn MessagingGateway>, glyphs: NoteConfig) -> Self {
        Self { gateway, glyphs }
    }

    fn glyph(&self, kind: NoteKind) -> &str {
        match kind {
            NoteKind::Info => &self.glyphs.info,
            NoteKind::Music => &self.glyphs.music,
            NoteKind::Search => &self.glyphs.search,
            NoteKind::Fail => &self.glyphs.fail,
        }
    }

    pub fn format(&self, line: &str, kind: NoteKind) -> String {
        format!("{} {}", self.glyph(kind), line)
    }

    /// Send `text` line by line. Returns how many lines were posted.
    ///
    /// Blank lines are skipped. Delivery problems are logged and stop the
    /// remaining lines; they never reach the caller.
    pub async fn emit(&self, channel: &ChannelId, text: &str, kind: NoteKind) -> usize {
        let mut sent = 0;
        for line in text.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
            let content = Content::text(self.format(line, kind));
            match self.gateway.send_message(channel, &content).await {
                Ok(_) => sent += 1,
                Err(e) if e.is_channel_unavailable() => {
                    debug!(channel = %channel, error = %e, "Note target unavailable, dropping note");
                    break;
                }
                Err(e) => {
                    warn!(channel = %channel, kind = ?kind, error = %e, "Failed to send note");
                    break;
                }
            }
        }
        sent
    }

    pub async fn info(&self, channel: &ChannelId, text: &str) -> usize {
        self.emit(channel, text, NoteKind::Info).await
    }

    pub async fn music(&self, channel: &ChannelId, text: &str) -> usize {
        self.emit(channel, text, NoteKind::Music).await
    }

    pub async fn search(&self, channel: &ChannelId, text: &str) -> usize {
        self.emit(channel, text, NoteKind::Search).await
    }

    pub async fn fail(&self, channel: &ChannelId, text: &str) -> usize {
        self.emit(channel, text, NoteKind::Fail).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactkit_channels::MemoryGateway;

    fn channel() -> ChannelId {
        ChannelId("general".into())
    }

    #[tokio::test]
    async fn one_message_per_line_with_glyph() {
        let gw = Arc::new(MemoryGateway::new());
        let notes = NoteEmitter::new(gw.clone(), NoteConfig::default());

        let sent = notes.info(&channel(), "first\n\nsecond  \n").await;
        assert_eq!(sent, 2);
        assert_eq!(
            gw.sent_to(&channel()),
            vec![Content::text("ℹ️ first"), Content::text("ℹ️ second")]
        );
    }

    #[tokio::test]
    async fn glyph_per_kind() {
        let gw = Arc::new(MemoryGateway::new());
        let notes = NoteEmitter::new(gw.clone(), NoteConfig::default());
        assert_eq!(notes.format("x", NoteKind::Music), "🎵 x");
        assert_eq!(notes.format("x", NoteKind::Search), "🔍 x");
        assert_eq!(notes.format("x", NoteKind::Fail), "❌ x");
    }

    #[tokio::test]
    async fn unavailable_channel_is_a_silent_no_op() {
        let gw = Arc::new(MemoryGateway::new());
        gw.close_channel(&channel());
        let notes = NoteEmitter::new(gw.clone(), NoteConfig::default());
        assert_eq!(notes.fail(&channel(), "oops").await, 0);
    }
}
