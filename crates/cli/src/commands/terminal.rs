//! Shared wiring for the interactive commands: config, console gateway,
//! note emitter and session controller.

use std::sync::Arc;

use reactkit_channels::ConsoleGateway;
use reactkit_config::AppConfig;
use reactkit_core::event::{CloseReason, SessionEvent};
use reactkit_core::gateway::{ChannelId, User};
use reactkit_session::{NoteEmitter, SessionController, SessionHandle};
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub struct Terminal {
    pub config: AppConfig,
    pub gateway: Arc<ConsoleGateway>,
    pub notes: NoteEmitter,
    pub controller: SessionController,
    pub channel: ChannelId,
}

impl Terminal {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: AppConfig) -> Self {
        if config.gateway.kind != "console" {
            warn!(
                kind = %config.gateway.kind,
                "Only the console gateway is available from the CLI, using it instead"
            );
        }

        let gateway = Arc::new(ConsoleGateway::new(config.gateway.user.clone()));
        let notes = NoteEmitter::new(gateway.clone(), config.notes.clone());
        let controller =
            SessionController::new(gateway.clone(), config.sessions.clone(), notes.clone());
        let channel = ChannelId(config.gateway.channel.clone());

        Self {
            config,
            gateway,
            notes,
            controller,
            channel,
        }
    }

    pub fn user(&self) -> &User {
        self.gateway.local_user()
    }

    /// Feed stdin to the session until it closes, input ends, or Ctrl-C.
    pub async fn run_session(&self, handle: &SessionHandle) {
        if handle.is_detached() {
            return;
        }

        let mut input = self.gateway.start_input();
        tokio::select! {
            _ = handle.closed() => {}
            _ = &mut input => {
                debug!("Input ended, closing session");
                handle.stop().await;
                handle.closed().await;
            }
            _ = tokio::signal::ctrl_c() => {
                handle.stop().await;
                handle.closed().await;
            }
        }
        input.abort();
    }
}

/// What happened to the sessions seen on the bus.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub pages_turned: usize,
    pub votes: usize,
    pub failed_votes: usize,
    pub rating: Option<i64>,
    pub closed: Option<CloseReason>,
}

/// Drain the buffered events into a [`Summary`].
pub fn summarize(events: &mut broadcast::Receiver<Arc<SessionEvent>>) -> Summary {
    let mut summary = Summary::default();
    while let Ok(event) = events.try_recv() {
        match event.as_ref() {
            SessionEvent::Opened { .. } => {}
            SessionEvent::Navigated { .. } => summary.pages_turned += 1,
            SessionEvent::Rated { rating, .. } => {
                summary.votes += 1;
                summary.rating = Some(*rating);
            }
            SessionEvent::VoteFailed { .. } => summary.failed_votes += 1,
            SessionEvent::Closed { reason, .. } => summary.closed = Some(*reason),
        }
    }
    summary
}
