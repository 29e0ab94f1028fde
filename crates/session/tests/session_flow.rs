//! End-to-end session tests against the in-memory gateway.
//!
//! These drive real widgets through reactions injected on the loopback
//! gateway and observe the engine through its event bus and the gateway's
//! recorded calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reactkit_channels::{GatewayOp, MemoryGateway};
use reactkit_config::{NoteConfig, SessionConfig};
use reactkit_core::content::{Content, Embed};
use reactkit_core::error::ScoringError;
use reactkit_core::event::{CloseReason, SessionEvent, SessionKind};
use reactkit_core::gateway::{ChannelId, MessageHandle, User, UserId};
use reactkit_session::{
    NoteEmitter, PagedRequest, RatedSubject, RatingRequest, RatingScorer, SessionController,
    SessionHandle, SessionState, Track,
};
use tokio::sync::broadcast;

// ── Helpers ──────────────────────────────────────────────────────────────

type Events = broadcast::Receiver<Arc<SessionEvent>>;

fn channel() -> ChannelId {
    ChannelId("music".into())
}

fn controller(gw: &Arc<MemoryGateway>) -> SessionController {
    let notes = NoteEmitter::new(gw.clone(), NoteConfig::default());
    SessionController::new(gw.clone(), SessionConfig::default(), notes)
}

async fn next_event(events: &mut Events) -> Arc<SessionEvent> {
    tokio::time::timeout(Duration::from_secs(3), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event bus closed")
}

/// Skip ahead to the next event that is not `Opened`.
async fn next_change(events: &mut Events) -> Arc<SessionEvent> {
    loop {
        let event = next_event(events).await;
        if !matches!(event.as_ref(), SessionEvent::Opened { .. }) {
            return event;
        }
    }
}

async fn expect_rated(events: &mut Events) -> i64 {
    match next_change(events).await.as_ref() {
        SessionEvent::Rated { rating, .. } => *rating,
        other => panic!("Expected Rated, got {other:?}"),
    }
}

async fn expect_cursor(events: &mut Events) -> usize {
    match next_change(events).await.as_ref() {
        SessionEvent::Navigated { cursor, .. } => *cursor,
        other => panic!("Expected Navigated, got {other:?}"),
    }
}

async fn expect_closed(events: &mut Events) -> CloseReason {
    match next_change(events).await.as_ref() {
        SessionEvent::Closed { reason, .. } => *reason,
        other => panic!("Expected Closed, got {other:?}"),
    }
}

/// Give the engine time to look at an input that produces no event.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(60)).await;
}

fn rating_shown(gw: &MemoryGateway, anchor: &MessageHandle) -> Option<String> {
    match gw.content_of(&anchor.id)? {
        Content::Embed(embed) => embed.field_value("Rating").map(String::from),
        Content::Text { .. } => None,
    }
}

fn notes_with_prefix(gw: &MemoryGateway, prefix: &str) -> Vec<String> {
    gw.sent_to(&channel())
        .iter()
        .map(Content::as_plain_text)
        .filter(|text| text.starts_with(prefix))
        .collect()
}

/// Accepts every vote unless it comes from `reject_from`.
#[derive(Default)]
struct TestScorer {
    reject_from: Option<UserId>,
    calls: AtomicUsize,
}

#[async_trait]
impl RatingScorer for TestScorer {
    async fn score(
        &self,
        _subject: &dyn RatedSubject,
        voter: &User,
        _delta: i64,
    ) -> Result<(), ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_from.as_ref() == Some(&voter.id) {
            return Err(ScoringError::new("vote store unavailable"));
        }
        Ok(())
    }
}

async fn open_track(
    ctl: &SessionController,
    title: &str,
    scorer: Arc<TestScorer>,
    ttl: Option<Duration>,
) -> (SessionHandle, MessageHandle) {
    let handle = ctl
        .open_rating(RatingRequest {
            channel: channel(),
            requester: UserId("dj".into()),
            subject: Box::new(Track::new(title)),
            scorer,
            ttl,
        })
        .await
        .expect("rating session opens");
    let anchor = handle.anchor().expect("session is live").clone();
    (handle, anchor)
}

async fn open_pages(
    ctl: &SessionController,
    owner: &str,
    count: usize,
    ttl: Option<Duration>,
) -> (SessionHandle, MessageHandle) {
    let pages = (1..=count)
        .map(|i| Content::text(format!("page {i}")))
        .collect();
    let handle = ctl
        .open_paged(PagedRequest {
            channel: channel(),
            owner: UserId(owner.into()),
            pages,
            ttl,
        })
        .await
        .expect("paged session opens");
    let anchor = handle.anchor().expect("session is live").clone();
    (handle, anchor)
}

// ── Rating sessions ──────────────────────────────────────────────────────

#[tokio::test]
async fn rating_up_down_flag_end_to_end() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let (handle, anchor) = open_track(&ctl, "A", Arc::new(TestScorer::default()), None).await;

    assert_eq!(gw.reactions_on(&anchor.id), vec!["👍", "👎", "💩"]);
    assert_eq!(rating_shown(&gw, &anchor).as_deref(), Some("0"));

    gw.inject_reaction(&anchor, "👍", User::human("u1")).await.unwrap();
    assert_eq!(expect_rated(&mut events).await, 1);
    assert_eq!(gw.edit_count(&anchor.id), 1);
    assert_eq!(rating_shown(&gw, &anchor).as_deref(), Some("1"));

    gw.inject_reaction(&anchor, "👎", User::human("u1")).await.unwrap();
    assert_eq!(expect_rated(&mut events).await, 0);
    assert_eq!(gw.edit_count(&anchor.id), 2);

    gw.inject_reaction(&anchor, "💩", User::human("u2")).await.unwrap();
    assert_eq!(expect_rated(&mut events).await, -1000);
    assert_eq!(expect_closed(&mut events).await, CloseReason::Flagged);

    assert_eq!(rating_shown(&gw, &anchor).as_deref(), Some("-1000"));
    assert_eq!(
        notes_with_prefix(&gw, "🎵"),
        vec!["🎵 Let me clean that 💩 for you".to_string()]
    );
    assert!(gw.ops().contains(&GatewayOp::RemoveReaction {
        message: anchor.id.clone(),
        emoji: "💩".into(),
        user: UserId("u2".into()),
    }));
    assert_eq!(handle.state(), SessionState::Closed);
    assert_eq!(gw.active_subscriptions(), 0);
    assert!(gw.reactions_on(&anchor.id).is_empty());
    assert!(!ctl.is_active(&anchor.id).await);
}

#[tokio::test]
async fn bot_votes_are_ignored() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let scorer = Arc::new(TestScorer::default());
    let (_handle, anchor) = open_track(&ctl, "A", scorer.clone(), None).await;

    gw.inject_reaction(&anchor, "👍", User::bot("other-bot")).await.unwrap();
    gw.inject_reaction(&anchor, "💩", User::bot("other-bot")).await.unwrap();
    settle().await;
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(gw.edit_count(&anchor.id), 0);

    gw.inject_reaction(&anchor, "👍", User::human("u1")).await.unwrap();
    assert_eq!(expect_rated(&mut events).await, 1);
    assert!(ctl.is_active(&anchor.id).await);
}

#[tokio::test]
async fn vote_then_flag_from_different_users_apply_in_order() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let scorer = Arc::new(TestScorer::default());
    let (handle, anchor) = open_track(&ctl, "A", scorer.clone(), None).await;

    gw.inject_reaction(&anchor, "👍", User::human("u1")).await.unwrap();
    gw.inject_reaction(&anchor, "💩", User::human("u2")).await.unwrap();

    assert_eq!(expect_rated(&mut events).await, 1);
    assert_eq!(expect_rated(&mut events).await, -999);
    assert_eq!(expect_closed(&mut events).await, CloseReason::Flagged);
    assert_eq!(rating_shown(&gw, &anchor).as_deref(), Some("-999"));
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(handle.state(), SessionState::Closed);
}

#[tokio::test]
async fn repeated_votes_from_one_user_all_count() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let (_handle, anchor) = open_track(&ctl, "A", Arc::new(TestScorer::default()), None).await;

    for expected in 1..=3 {
        gw.inject_reaction(&anchor, "👍", User::human("u1")).await.unwrap();
        assert_eq!(expect_rated(&mut events).await, expected);
    }
}

#[tokio::test]
async fn scoring_failure_keeps_session_active() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let scorer = Arc::new(TestScorer {
        reject_from: Some(UserId("grumpy".into())),
        ..TestScorer::default()
    });
    let (handle, anchor) = open_track(&ctl, "A", scorer, None).await;

    gw.inject_reaction(&anchor, "👍", User::human("grumpy")).await.unwrap();
    match next_change(&mut events).await.as_ref() {
        SessionEvent::VoteFailed { reason, .. } => {
            assert!(reason.starts_with("Scoring failed"));
            assert!(reason.contains("unavailable"));
        }
        other => panic!("Expected VoteFailed, got {other:?}"),
    }
    assert_eq!(gw.edit_count(&anchor.id), 0);
    assert_eq!(notes_with_prefix(&gw, "❌").len(), 1);
    assert_eq!(handle.state(), SessionState::Active);

    // A rejected flag does not close the session either.
    gw.inject_reaction(&anchor, "💩", User::human("grumpy")).await.unwrap();
    assert!(matches!(
        next_change(&mut events).await.as_ref(),
        SessionEvent::VoteFailed { .. }
    ));
    assert_eq!(handle.state(), SessionState::Active);

    gw.inject_reaction(&anchor, "👍", User::human("u1")).await.unwrap();
    assert_eq!(expect_rated(&mut events).await, 1);
}

#[tokio::test]
async fn votes_are_applied_one_render_at_a_time() {
    let gw = Arc::new(MemoryGateway::new().with_latency(Duration::from_millis(40)));
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let (_handle, anchor) = open_track(&ctl, "A", Arc::new(TestScorer::default()), None).await;

    // Both arrive while the first render is still in flight.
    gw.inject_reaction(&anchor, "👍", User::human("u1")).await.unwrap();
    gw.inject_reaction(&anchor, "👍", User::human("u2")).await.unwrap();

    assert_eq!(expect_rated(&mut events).await, 1);
    assert_eq!(expect_rated(&mut events).await, 2);

    let edits: Vec<GatewayOp> = gw
        .ops()
        .into_iter()
        .filter(|op| {
            matches!(
                op,
                GatewayOp::EditStarted { .. } | GatewayOp::EditFinished { .. }
            )
        })
        .collect();
    assert_eq!(edits.len(), 4);
    assert!(matches!(edits[0], GatewayOp::EditStarted { .. }));
    assert!(matches!(edits[1], GatewayOp::EditFinished { .. }));
    assert!(matches!(edits[2], GatewayOp::EditStarted { .. }));
    assert!(matches!(edits[3], GatewayOp::EditFinished { .. }));

    let shown: Vec<String> = edits
        .iter()
        .filter_map(|op| match op {
            GatewayOp::EditStarted {
                content: Content::Embed(embed),
                ..
            } => embed.field_value("Rating").map(String::from),
            _ => None,
        })
        .collect();
    assert_eq!(shown, vec!["1", "2"]);
    assert_eq!(rating_shown(&gw, &anchor).as_deref(), Some("2"));
}

// ── Paged sessions ───────────────────────────────────────────────────────

#[tokio::test]
async fn paged_navigation_is_owner_only_and_clamped() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let (_handle, anchor) = open_pages(&ctl, "alice", 3, None).await;

    assert_eq!(gw.content_of(&anchor.id), Some(Content::text("page 1")));

    // Back on the first page and someone else's forward: nothing happens.
    gw.inject_reaction(&anchor, "⏪", User::human("alice")).await.unwrap();
    gw.inject_reaction(&anchor, "⏩", User::human("bob")).await.unwrap();
    settle().await;
    assert_eq!(gw.edit_count(&anchor.id), 0);

    gw.inject_reaction(&anchor, "⏩", User::human("alice")).await.unwrap();
    assert_eq!(expect_cursor(&mut events).await, 1);
    gw.inject_reaction(&anchor, "⏩", User::human("alice")).await.unwrap();
    assert_eq!(expect_cursor(&mut events).await, 2);
    assert_eq!(gw.content_of(&anchor.id), Some(Content::text("page 3")));

    // Forward on the last page renders nothing.
    gw.inject_reaction(&anchor, "⏩", User::human("alice")).await.unwrap();
    settle().await;
    assert_eq!(gw.edit_count(&anchor.id), 2);

    gw.inject_reaction(&anchor, "⏪", User::human("alice")).await.unwrap();
    assert_eq!(expect_cursor(&mut events).await, 1);
    assert_eq!(gw.content_of(&anchor.id), Some(Content::text("page 2")));
    assert_eq!(gw.edit_count(&anchor.id), 3);
}

#[tokio::test]
async fn back_after_forward_lands_on_first_page() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let (_handle, anchor) = open_pages(&ctl, "alice", 2, None).await;

    gw.inject_reaction(&anchor, "⏩", User::human("alice")).await.unwrap();
    gw.inject_reaction(&anchor, "⏪", User::human("alice")).await.unwrap();

    assert_eq!(expect_cursor(&mut events).await, 1);
    assert_eq!(expect_cursor(&mut events).await, 0);
    assert_eq!(gw.content_of(&anchor.id), Some(Content::text("page 1")));
    assert_eq!(gw.edit_count(&anchor.id), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_controls_keep_arrival_order_across_workers() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();

    for _ in 0..25 {
        let (handle, anchor) = open_pages(&ctl, "alice", 2, None).await;
        gw.inject_reaction(&anchor, "⏩", User::human("alice")).await.unwrap();
        gw.inject_reaction(&anchor, "⏪", User::human("alice")).await.unwrap();

        assert_eq!(expect_cursor(&mut events).await, 1);
        assert_eq!(expect_cursor(&mut events).await, 0);
        assert_eq!(gw.content_of(&anchor.id), Some(Content::text("page 1")));

        assert!(handle.stop().await);
        assert_eq!(expect_closed(&mut events).await, CloseReason::Stopped);
    }
    assert_eq!(gw.active_subscriptions(), 0);
}

#[tokio::test]
async fn embed_pages_carry_page_footer() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();

    let handle = ctl
        .open_paged(PagedRequest {
            channel: channel(),
            owner: UserId("alice".into()),
            pages: vec![
                Embed::new("Queue").description("1. intro").into(),
                Embed::new("Queue").description("2. outro").into(),
            ],
            ttl: None,
        })
        .await
        .unwrap();
    let anchor = handle.anchor().unwrap().clone();

    match gw.content_of(&anchor.id) {
        Some(Content::Embed(embed)) => assert_eq!(embed.footer.as_deref(), Some("Page 1/2")),
        other => panic!("Expected embed, got {other:?}"),
    }

    gw.inject_reaction(&anchor, "⏩", User::human("alice")).await.unwrap();
    assert_eq!(expect_cursor(&mut events).await, 1);
    match gw.content_of(&anchor.id) {
        Some(Content::Embed(embed)) => assert_eq!(embed.footer.as_deref(), Some("Page 2/2")),
        other => panic!("Expected embed, got {other:?}"),
    }
}

#[tokio::test]
async fn controls_are_attached_in_order() {
    let gw = Arc::new(MemoryGateway::new().with_latency(Duration::from_millis(20)));
    let ctl = controller(&gw);
    let (_handle, anchor) = open_pages(&ctl, "alice", 2, None).await;

    let attaches: Vec<GatewayOp> = gw
        .ops()
        .into_iter()
        .filter(|op| {
            matches!(
                op,
                GatewayOp::AttachStarted { .. } | GatewayOp::AttachFinished { .. }
            )
        })
        .collect();
    let attach = |started: bool, emoji: &str| {
        if started {
            GatewayOp::AttachStarted {
                message: anchor.id.clone(),
                emoji: emoji.into(),
            }
        } else {
            GatewayOp::AttachFinished {
                message: anchor.id.clone(),
                emoji: emoji.into(),
            }
        }
    };
    assert_eq!(
        attaches,
        vec![
            attach(true, "⏪"),
            attach(false, "⏪"),
            attach(true, "⏩"),
            attach(false, "⏩"),
        ]
    );
}

// ── Lifecycle ────────────────────────────────────────────────────────────

#[tokio::test]
async fn expiry_tears_down_silently() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let (handle, anchor) = open_pages(&ctl, "alice", 2, Some(Duration::from_millis(80))).await;

    let info = ctl.active_sessions().await;
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].kind, SessionKind::Paged);
    assert_eq!(info[0].owner, UserId("alice".into()));
    assert!(info[0].expires_at > info[0].created_at);

    assert_eq!(expect_closed(&mut events).await, CloseReason::Expired);
    handle.closed().await;

    assert_eq!(handle.state(), SessionState::Closed);
    assert_eq!(gw.active_subscriptions(), 0);
    assert!(gw.reactions_on(&anchor.id).is_empty());
    // Only the widget itself was posted: no note on expiry.
    assert_eq!(gw.sent_to(&channel()).len(), 1);
    assert!(ctl.active_sessions().await.is_empty());

    // A closed widget no longer listens.
    let delivered = gw
        .inject_reaction(&anchor, "⏩", User::human("alice"))
        .await
        .unwrap();
    assert_eq!(delivered, 0);
    assert_eq!(gw.edit_count(&anchor.id), 0);
}

#[tokio::test]
async fn stopping_twice_closes_once() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let (handle, anchor) = open_pages(&ctl, "alice", 2, None).await;

    assert!(handle.stop().await);
    ctl.stop(&anchor.id).await;
    assert_eq!(expect_closed(&mut events).await, CloseReason::Stopped);
    handle.closed().await;

    assert!(!handle.stop().await);
    assert!(!ctl.stop(&anchor.id).await);
    settle().await;

    let clears = gw
        .ops()
        .into_iter()
        .filter(|op| matches!(op, GatewayOp::ClearReactions { .. }))
        .count();
    assert_eq!(clears, 1);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn stop_racing_expiry_closes_once() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let (handle, _anchor) = open_track(
        &ctl,
        "A",
        Arc::new(TestScorer::default()),
        Some(Duration::from_millis(30)),
    )
    .await;

    tokio::time::sleep(Duration::from_millis(30)).await;
    handle.stop().await;
    handle.closed().await;
    settle().await;

    let reason = expect_closed(&mut events).await;
    assert!(matches!(reason, CloseReason::Expired | CloseReason::Stopped));
    assert!(events.try_recv().is_err());
    assert_eq!(gw.active_subscriptions(), 0);
}

#[tokio::test]
async fn sessions_are_independent() {
    let gw = Arc::new(MemoryGateway::new());
    let ctl = controller(&gw);
    let mut events = ctl.events().subscribe();
    let (_pages, pages_anchor) = open_pages(&ctl, "alice", 2, None).await;
    let (_track, track_anchor) = open_track(&ctl, "B", Arc::new(TestScorer::default()), None).await;

    assert_eq!(ctl.active_sessions().await.len(), 2);

    gw.inject_reaction(&track_anchor, "💩", User::human("u1")).await.unwrap();
    assert_eq!(expect_rated(&mut events).await, -1000);
    assert_eq!(expect_closed(&mut events).await, CloseReason::Flagged);

    assert!(ctl.is_active(&pages_anchor.id).await);
    assert!(!ctl.is_active(&track_anchor.id).await);

    gw.inject_reaction(&pages_anchor, "⏩", User::human("alice")).await.unwrap();
    assert_eq!(expect_cursor(&mut events).await, 1);
    assert_eq!(gw.edit_count(&pages_anchor.id), 1);
}
