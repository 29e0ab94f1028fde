//! Interactive session engine for reactkit.
//!
//! Turns one outbound message into a short-lived widget driven by emoji
//! reactions:
//! - **Paged viewer** — ⏪/⏩ move through pre-rendered pages (owner only)
//! - **Rating widget** — 👍/👎 adjust a subject's rating, 💩 floors it and
//!   closes the widget
//!
//! Every session owns one input queue drained by a single task, so reactions
//! on the same message are applied strictly in arrival order and each render
//! completes before the next reaction is looked at.

pub mod collector;
pub mod controller;
pub mod followup;
pub mod note;
pub mod paged;
pub mod poster;
pub mod rating;

pub use collector::{Collected, CollectorHandle, ReactionCollector};
pub use controller::{
    PagedRequest, RatingRequest, SessionController, SessionHandle, SessionInfo, SessionState,
};
pub use followup::FollowUpCollector;
pub use note::{NoteEmitter, NoteKind};
pub use paged::{Navigation, PagedSession};
pub use poster::ReactionPoster;
pub use rating::{RatedSubject, RatingScorer, RatingSession, Track, Vote, VoteOutcome};
