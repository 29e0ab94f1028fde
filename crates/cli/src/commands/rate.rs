//! `reactkit rate` — Vote on a track with reactions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reactkit_core::error::ScoringError;
use reactkit_core::gateway::{User, UserId};
use reactkit_session::{RatedSubject, RatingRequest, RatingScorer, Track};
use tracing::info;

use super::terminal::{Terminal, summarize};

/// Keeps a per-voter tally in memory and logs every vote.
#[derive(Default)]
pub struct TallyScorer {
    tally: Mutex<HashMap<UserId, i64>>,
}

impl TallyScorer {
    pub fn votes_by(&self, voter: &UserId) -> i64 {
        self.tally
            .lock()
            .map(|t| t.get(voter).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl RatingScorer for TallyScorer {
    async fn score(
        &self,
        subject: &dyn RatedSubject,
        voter: &User,
        delta: i64,
    ) -> Result<(), ScoringError> {
        let mut tally = self
            .tally
            .lock()
            .map_err(|_| ScoringError::new("tally lock poisoned"))?;
        let total = tally.entry(voter.id.clone()).or_default();
        *total = total.saturating_add(delta);
        info!(
            voter = %voter.id,
            delta,
            rating = subject.rating(),
            "Vote recorded"
        );
        Ok(())
    }
}

pub async fn run(
    title: String,
    artist: Option<String>,
    rating: i64,
    ttl: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let terminal = Terminal::open()?;
    let controls = &terminal.config.sessions.controls;
    let mut events = terminal.controller.events().subscribe();

    println!(
        "🎵 React with {} / {} to vote, {} to flag.",
        controls.up, controls.down, controls.flag
    );
    println!("   Prefix with `@name` to vote as someone else. Type `exit` to close.\n");

    let mut track = Track::new(title);
    track.artist = artist;
    track.rating = rating;

    let handle = terminal
        .controller
        .open_rating(RatingRequest {
            channel: terminal.channel.clone(),
            requester: terminal.user().id.clone(),
            subject: Box::new(track),
            scorer: Arc::new(TallyScorer::default()),
            ttl: ttl.map(Duration::from_secs),
        })
        .await?;

    if handle.is_detached() {
        println!("⚠️  Channel {} is unavailable", terminal.channel);
        return Ok(());
    }

    terminal.run_session(&handle).await;

    let summary = summarize(&mut events);
    println!("\n   Votes:        {}", summary.votes);
    if summary.failed_votes > 0 {
        println!("   Rejected:     {}", summary.failed_votes);
    }
    println!("   Final rating: {}", summary.rating.unwrap_or(rating));
    if let Some(reason) = summary.closed {
        println!("   Closed:       {reason:?}");
    }
    Ok(())
}
