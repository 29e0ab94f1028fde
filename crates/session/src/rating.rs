//! Rating widget state: a rated subject, an external scorer, and vote deltas.

use std::sync::Arc;

use async_trait::async_trait;
use reactkit_core::content::{Content, Embed};
use reactkit_core::error::{ScoringError, SessionError};
use reactkit_core::gateway::User;
use serde::{Deserialize, Serialize};

/// A record with a mutable rating that can render itself.
pub trait RatedSubject: Send + Sync {
    fn rating(&self) -> i64;

    fn set_rating(&mut self, rating: i64);

    /// Message content showing the subject with its current rating.
    fn render(&self) -> Content;
}

/// External scoring callback, consulted before a vote changes the rating.
///
/// Persisting votes, rate limiting and per-user rules are its business; a
/// returned error rejects that one vote.
#[async_trait]
pub trait RatingScorer: Send + Sync {
    async fn score(
        &self,
        subject: &dyn RatedSubject,
        voter: &User,
        delta: i64,
    ) -> Result<(), ScoringError>;
}

/// A song as shown by the now-playing card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub rating: i64,
}

impl Track {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: None,
            url: None,
            rating: 0,
        }
    }
}

impl RatedSubject for Track {
    fn rating(&self) -> i64 {
        self.rating
    }

    fn set_rating(&mut self, rating: i64) {
        self.rating = rating;
    }

    fn render(&self) -> Content {
        let mut embed = Embed::new(&self.title);
        if let Some(artist) = &self.artist {
            embed = embed.description(artist);
        }
        if let Some(url) = &self.url {
            embed = embed.url(url);
        }
        embed.field("Rating", self.rating.to_string(), true).into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Up,
    Down,
    /// Floors the rating and ends the session
    Flag,
}

impl Vote {
    pub fn delta(self, flag_delta: i64) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
            Self::Flag => flag_delta,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Flag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub rating: i64,
    pub delta: i64,
    pub terminal: bool,
}

pub struct RatingSession {
    subject: Box<dyn RatedSubject>,
    scorer: Arc<dyn RatingScorer>,
    flag_delta: i64,
}

impl RatingSession {
    pub fn new(subject: Box<dyn RatedSubject>, scorer: Arc<dyn RatingScorer>, flag_delta: i64) -> Self {
        Self {
            subject,
            scorer,
            flag_delta,
        }
    }

    pub fn rating(&self) -> i64 {
        self.subject.rating()
    }

    pub fn render(&self) -> Content {
        self.subject.render()
    }

    /// Score a vote and, if the scorer accepts it, apply its delta.
    ///
    /// A rejected vote leaves the rating untouched.
    pub async fn apply(&mut self, vote: Vote, voter: &User) -> Result<VoteOutcome, SessionError> {
        let delta = vote.delta(self.flag_delta);
        self.scorer.score(self.subject.as_ref(), voter, delta).await?;

        let rating = self.subject.rating().saturating_add(delta);
        self.subject.set_rating(rating);
        Ok(VoteOutcome {
            rating,
            delta,
            terminal: vote.is_terminal(),
        })
    }
}
