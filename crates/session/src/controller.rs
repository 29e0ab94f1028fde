//! Session controller — owns every live interactive widget.
//!
//! Opening a widget sends the first render, attaches the control emojis in
//! order, and opens one [`ReactionCollector`] whose filter accepts any of the
//! per-control filters. The collector forwards into the session's single
//! input queue in gateway arrival order. One task drains that queue, so a
//! reaction is fully handled before the next one on the same message is
//! looked at.
//!
//! ```text
//!   open ──► Active ──(reaction)──► Active
//!               │
//!               └─(expiry | flag | stop)──► Closing ──► Closed
//! ```
//!
//! Teardown is the only place that closes subscriptions and strips icons,
//! and it runs at most once per session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reactkit_config::SessionConfig;
use reactkit_core::content::Content;
use reactkit_core::error::SessionError;
use reactkit_core::event::{CloseReason, EventBus, SessionEvent, SessionKind};
use reactkit_core::filter::ReactionFilter;
use reactkit_core::gateway::{
    ChannelId, MessageHandle, MessageId, MessagingGateway, ReactionEvent, UserId,
};
use serde::Serialize;
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, info, warn};

use crate::collector::{Collected, CollectorHandle, ReactionCollector, deadline_after};
use crate::note::{NoteEmitter, NoteKind};
use crate::paged::{Navigation, PagedSession};
use crate::poster::ReactionPoster;
use crate::rating::{RatedSubject, RatingScorer, RatingSession, Vote};

/// Lifecycle of one session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Closing,
    Closed,
}

/// Snapshot of a live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub anchor: MessageHandle,
    /// The user allowed to navigate (paged) or who requested the widget (rating)
    pub owner: UserId,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Request to show pre-rendered pages with ⏪/⏩ navigation.
pub struct PagedRequest {
    pub channel: ChannelId,
    pub owner: UserId,
    pub pages: Vec<Content>,
    /// Overrides `sessions.paged_ttl_secs`
    pub ttl: Option<Duration>,
}

/// Request to show a subject with 👍/👎/💩 voting.
pub struct RatingRequest {
    pub channel: ChannelId,
    pub requester: UserId,
    pub subject: Box<dyn RatedSubject>,
    pub scorer: Arc<dyn RatingScorer>,
    /// Overrides `sessions.rating_ttl_secs`
    pub ttl: Option<Duration>,
}

#[derive(Debug)]
enum SessionInput {
    Reaction(ReactionEvent),
    Expired,
    Stop,
}

enum Widget {
    Paged(PagedSession),
    Rating(RatingSession),
}

/// Everything needed to put a widget on screen.
struct WidgetPlan {
    channel: ChannelId,
    owner: UserId,
    kind: SessionKind,
    first: Content,
    /// Control emoji and who may press it, in attach order
    controls: Vec<(String, ReactionFilter)>,
    ttl: Duration,
    widget: Widget,
}

/// State owned by the session's draining task.
struct LiveSession {
    info: SessionInfo,
    widget: Widget,
    control: CollectorHandle,
    state: watch::Sender<SessionState>,
}

impl LiveSession {
    /// Move Active → Closing. Returns `false` if teardown already started.
    fn begin_closing(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Active {
                *state = SessionState::Closing;
                true
            } else {
                false
            }
        })
    }
}

struct SessionEntry {
    info: SessionInfo,
    input: mpsc::Sender<SessionInput>,
}

/// Owns the set of active sessions. Cheap to clone.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

struct Shared {
    gateway: Arc<dyn MessagingGateway>,
    poster: ReactionPoster,
    notes: NoteEmitter,
    config: SessionConfig,
    events: EventBus,
    sessions: RwLock<HashMap<MessageId, SessionEntry>>,
}

impl SessionController {
    pub fn new(gateway: Arc<dyn MessagingGateway>, config: SessionConfig, notes: NoteEmitter) -> Self {
        Self {
            shared: Arc::new(Shared {
                poster: ReactionPoster::new(gateway.clone()),
                gateway,
                notes,
                config,
                events: EventBus::default(),
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Bus carrying every [`SessionEvent`] this controller produces.
    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Show `pages` and let `owner` flip through them.
    ///
    /// If the channel is gone the call succeeds with a detached handle and
    /// nothing is shown.
    pub async fn open_paged(&self, request: PagedRequest) -> Result<SessionHandle, SessionError> {
        let shared = &self.shared;
        let paged = match PagedSession::new(request.pages, shared.config.page_footer) {
            Ok(paged) => paged,
            Err(e) => {
                shared.notes.fail(&request.channel, "Nothing to show").await;
                return Err(e);
            }
        };

        let controls = &shared.config.controls;
        let filters = vec![
            (
                controls.back.clone(),
                ReactionFilter::owner_control(&controls.back, &request.owner),
            ),
            (
                controls.forward.clone(),
                ReactionFilter::owner_control(&controls.forward, &request.owner),
            ),
        ];

        let plan = WidgetPlan {
            channel: request.channel,
            owner: request.owner,
            kind: SessionKind::Paged,
            first: paged.current(),
            controls: filters,
            ttl: request.ttl.unwrap_or_else(|| shared.config.paged_ttl()),
            widget: Widget::Paged(paged),
        };
        shared.clone().open_widget(plan).await
    }

    /// Show `subject` and let any human vote on it.
    pub async fn open_rating(&self, request: RatingRequest) -> Result<SessionHandle, SessionError> {
        let shared = &self.shared;
        let rating = RatingSession::new(request.subject, request.scorer, shared.config.flag_delta);

        let controls = &shared.config.controls;
        let filters = [&controls.up, &controls.down, &controls.flag]
            .into_iter()
            .map(|emoji| (emoji.clone(), ReactionFilter::human_control(emoji)))
            .collect();

        let plan = WidgetPlan {
            channel: request.channel,
            owner: request.requester,
            kind: SessionKind::Rating,
            first: rating.render(),
            controls: filters,
            ttl: request.ttl.unwrap_or_else(|| shared.config.rating_ttl()),
            widget: Widget::Rating(rating),
        };
        shared.clone().open_widget(plan).await
    }

    /// Ask a session to close. Returns `false` if it is not active.
    pub async fn stop(&self, anchor: &MessageId) -> bool {
        let input = {
            let sessions = self.shared.sessions.read().await;
            sessions.get(anchor).map(|entry| entry.input.clone())
        };
        match input {
            Some(input) => input.send(SessionInput::Stop).await.is_ok(),
            None => false,
        }
    }

    /// Stop every active session.
    pub async fn stop_all(&self) -> usize {
        let inputs: Vec<_> = {
            let sessions = self.shared.sessions.read().await;
            sessions.values().map(|entry| entry.input.clone()).collect()
        };
        let mut stopped = 0;
        for input in inputs {
            if input.send(SessionInput::Stop).await.is_ok() {
                stopped += 1;
            }
        }
        stopped
    }

    pub async fn is_active(&self, anchor: &MessageId) -> bool {
        self.shared.sessions.read().await.contains_key(anchor)
    }

    pub async fn active_sessions(&self) -> Vec<SessionInfo> {
        self.shared
            .sessions
            .read()
            .await
            .values()
            .map(|entry| entry.info.clone())
            .collect()
    }
}

impl Shared {
    async fn open_widget(self: Arc<Self>, plan: WidgetPlan) -> Result<SessionHandle, SessionError> {
        let WidgetPlan {
            channel,
            owner,
            kind,
            first,
            controls,
            ttl,
            widget,
        } = plan;

        let anchor = match self.gateway.send_message(&channel, &first).await {
            Ok(anchor) => anchor,
            Err(e) if e.is_channel_unavailable() => {
                debug!(channel = %channel, error = %e, "Channel unavailable, widget not shown");
                return Ok(SessionHandle::detached());
            }
            Err(e) => {
                self.notes
                    .fail(&channel, &format!("Could not show that: {e}"))
                    .await;
                return Err(e.into());
            }
        };

        let emojis: Vec<&str> = controls.iter().map(|(emoji, _)| emoji.as_str()).collect();
        if let Err(e) = self.poster.attach_all(&anchor, &emojis).await {
            self.notes.fail(&channel, &e.to_string()).await;
            return Err(e);
        }

        // All controls share one feed so reactions reach the queue in arrival order.
        let filter = ReactionFilter::any_of(controls.into_iter().map(|(_, filter)| filter));
        let deadline = deadline_after(ttl);
        let collector =
            match ReactionCollector::open_until(self.gateway.clone(), &anchor, filter, deadline).await {
                Ok(collector) => collector,
                Err(e) => {
                    warn!(message = %anchor.id, error = %e, "Failed to subscribe to controls");
                    if let Err(clear) = self.gateway.clear_reactions(&anchor).await {
                        debug!(message = %anchor.id, error = %clear, "Could not clear reactions");
                    }
                    self.notes
                        .fail(&channel, &format!("Could not listen for reactions: {e}"))
                        .await;
                    return Err(e.into());
                }
            };
        let control = collector.handle();
        let (input_tx, input_rx) = mpsc::channel(self.config.queue_capacity);
        tokio::spawn(forward(collector, input_tx.clone()));

        let created_at = Utc::now();
        let info = SessionInfo {
            anchor: anchor.clone(),
            owner,
            kind,
            created_at,
            expires_at: expiry_after(created_at, ttl),
        };
        let (state_tx, state_rx) = watch::channel(SessionState::Active);

        self.sessions.write().await.insert(
            anchor.id.clone(),
            SessionEntry {
                info: info.clone(),
                input: input_tx.clone(),
            },
        );

        info!(
            message = %anchor.id,
            kind = %kind,
            owner = %info.owner,
            ttl_secs = ttl.as_secs(),
            "Session opened"
        );
        self.events.publish(SessionEvent::Opened {
            anchor: anchor.id.clone(),
            kind,
            timestamp: Utc::now(),
        });

        let live = LiveSession {
            info,
            widget,
            control,
            state: state_tx,
        };
        tokio::spawn(self.clone().drive(live, input_rx));

        Ok(SessionHandle {
            inner: Some(HandleInner {
                anchor,
                input: input_tx,
                state: state_rx,
            }),
        })
    }

    /// Drain the session's queue one input at a time until it closes.
    async fn drive(self: Arc<Self>, mut live: LiveSession, mut inputs: mpsc::Receiver<SessionInput>) {
        let reason = loop {
            let Some(input) = inputs.recv().await else {
                break CloseReason::Stopped;
            };
            match input {
                SessionInput::Reaction(event) => {
                    if let Some(reason) = self.handle_reaction(&mut live, event).await {
                        break reason;
                    }
                }
                SessionInput::Expired => break CloseReason::Expired,
                SessionInput::Stop => break CloseReason::Stopped,
            }
        };

        // Anything still queued is dropped whole with the receiver.
        inputs.close();
        self.teardown(&live, reason).await;
    }

    async fn handle_reaction(&self, live: &mut LiveSession, event: ReactionEvent) -> Option<CloseReason> {
        let controls = &self.config.controls;
        let anchor = &live.info.anchor;

        match &mut live.widget {
            Widget::Paged(paged) => {
                let direction = if event.emoji == controls.back {
                    Navigation::Back
                } else if event.emoji == controls.forward {
                    Navigation::Forward
                } else {
                    return None;
                };

                if !paged.navigate(direction) {
                    debug!(message = %anchor.id, cursor = paged.cursor(), "Navigation at boundary ignored");
                    return None;
                }

                let cursor = paged.cursor();
                self.render(anchor, &paged.current()).await;
                debug!(message = %anchor.id, cursor, "Page changed");
                self.events.publish(SessionEvent::Navigated {
                    anchor: anchor.id.clone(),
                    cursor,
                    timestamp: Utc::now(),
                });
                None
            }
            Widget::Rating(rating) => {
                let vote = if event.emoji == controls.up {
                    Vote::Up
                } else if event.emoji == controls.down {
                    Vote::Down
                } else if event.emoji == controls.flag {
                    Vote::Flag
                } else {
                    return None;
                };

                let outcome = match rating.apply(vote, &event.user).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(message = %anchor.id, voter = %event.user.id, error = %e, "Vote rejected by scorer");
                        self.notes
                            .fail(&anchor.channel, &format!("Could not record your vote: {e}"))
                            .await;
                        self.events.publish(SessionEvent::VoteFailed {
                            anchor: anchor.id.clone(),
                            reason: e.to_string(),
                            timestamp: Utc::now(),
                        });
                        return None;
                    }
                };

                if outcome.terminal {
                    if let Err(e) = self
                        .gateway
                        .remove_reaction(anchor, &event.emoji, &event.user.id)
                        .await
                    {
                        debug!(message = %anchor.id, error = %e, "Could not remove flag reaction");
                    }
                }

                self.render(anchor, &rating.render()).await;
                info!(
                    message = %anchor.id,
                    voter = %event.user.id,
                    delta = outcome.delta,
                    rating = outcome.rating,
                    "Vote applied"
                );
                self.events.publish(SessionEvent::Rated {
                    anchor: anchor.id.clone(),
                    rating: outcome.rating,
                    delta: outcome.delta,
                    timestamp: Utc::now(),
                });

                if outcome.terminal {
                    self.notes
                        .emit(&anchor.channel, &self.config.flag_note, NoteKind::Music)
                        .await;
                    return Some(CloseReason::Flagged);
                }
                None
            }
        }
    }

    async fn render(&self, anchor: &MessageHandle, content: &Content) -> bool {
        match self.gateway.edit_message(anchor, content).await {
            Ok(()) => true,
            Err(e) if e.is_channel_unavailable() => {
                debug!(message = %anchor.id, error = %e, "Widget gone, render skipped");
                false
            }
            Err(e) => {
                warn!(message = %anchor.id, error = %e, "Render failed");
                self.notes
                    .fail(&anchor.channel, &format!("Could not update the message: {e}"))
                    .await;
                false
            }
        }
    }

    /// Close subscriptions, strip icons, forget the session. Runs once.
    async fn teardown(&self, live: &LiveSession, reason: CloseReason) {
        if !live.begin_closing() {
            return;
        }
        let anchor = &live.info.anchor;

        live.control.close().await;
        if let Err(e) = self.gateway.clear_reactions(anchor).await {
            debug!(message = %anchor.id, error = %e, "Could not clear reactions");
        }
        self.sessions.write().await.remove(&anchor.id);
        live.state.send_replace(SessionState::Closed);

        info!(message = %anchor.id, reason = ?reason, "Session closed");
        self.events.publish(SessionEvent::Closed {
            anchor: anchor.id.clone(),
            reason,
            timestamp: Utc::now(),
        });
    }
}

/// Wall-clock expiry for a session opened at `created_at`, saturating.
fn expiry_after(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| created_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Pump the session's collector into its queue.
async fn forward(mut collector: ReactionCollector, inputs: mpsc::Sender<SessionInput>) {
    while let Some(item) = collector.next().await {
        let input = match item {
            Collected::Matched(event) => SessionInput::Reaction(event),
            Collected::Expired => SessionInput::Expired,
        };
        if inputs.send(input).await.is_err() {
            break;
        }
    }
}

/// Caller's view of one session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Option<HandleInner>,
}

#[derive(Clone)]
struct HandleInner {
    anchor: MessageHandle,
    input: mpsc::Sender<SessionInput>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    /// Stand-in returned when the widget could not be shown at all.
    pub fn detached() -> Self {
        Self { inner: None }
    }

    pub fn is_detached(&self) -> bool {
        self.inner.is_none()
    }

    pub fn anchor(&self) -> Option<&MessageHandle> {
        self.inner.as_ref().map(|inner| &inner.anchor)
    }

    pub fn state(&self) -> SessionState {
        match &self.inner {
            Some(inner) => *inner.state.borrow(),
            None => SessionState::Closed,
        }
    }

    /// Ask the session to close. Returns `false` if it already closed.
    pub async fn stop(&self) -> bool {
        match &self.inner {
            Some(inner) => inner.input.send(SessionInput::Stop).await.is_ok(),
            None => false,
        }
    }

    /// Wait until the session reaches `Closed`.
    pub async fn closed(&self) {
        if let Some(inner) = &self.inner {
            let mut state = inner.state.clone();
            // Sender dropped means the draining task is gone; treat as closed.
            let _ = state.wait_for(|s| *s == SessionState::Closed).await;
        }
    }
}
