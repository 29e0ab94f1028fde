//! First-class predicates over reactions and replies.
//!
//! Subscriptions are parameterized by these values instead of ad-hoc closures,
//! so the rule a collector applies can be inspected, logged, and tested.

use serde::{Deserialize, Serialize};

use crate::gateway::{IncomingMessage, ReactionEvent, UserId};

/// Decides which reactions a collector delivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReactionFilter {
    /// Every reaction
    Any,
    /// Only this emoji
    Emoji(String),
    /// Only reactions by this user
    User(UserId),
    /// Only reactions by non-automated accounts
    Humans,
    /// All inner filters must match
    All(Vec<ReactionFilter>),
    /// At least one inner filter must match
    AnyOf(Vec<ReactionFilter>),
}

impl ReactionFilter {
    pub fn matches(&self, event: &ReactionEvent) -> bool {
        match self {
            Self::Any => true,
            Self::Emoji(emoji) => event.emoji == *emoji,
            Self::User(id) => event.user.id == *id,
            Self::Humans => !event.user.is_bot,
            Self::All(filters) => filters.iter().all(|f| f.matches(event)),
            Self::AnyOf(filters) => filters.iter().any(|f| f.matches(event)),
        }
    }

    /// Combine two filters; either may match.
    pub fn or(self, other: ReactionFilter) -> Self {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::AnyOf(mut a), Self::AnyOf(b)) => {
                a.extend(b);
                Self::AnyOf(a)
            }
            (Self::AnyOf(mut a), f) => {
                a.push(f);
                Self::AnyOf(a)
            }
            (f, Self::AnyOf(mut b)) => {
                b.insert(0, f);
                Self::AnyOf(b)
            }
            (a, b) => Self::AnyOf(vec![a, b]),
        }
    }

    /// One filter accepting whatever any of `filters` accepts.
    ///
    /// An empty list accepts nothing.
    pub fn any_of(filters: impl IntoIterator<Item = ReactionFilter>) -> Self {
        let mut filters = filters.into_iter();
        match filters.next() {
            Some(first) => filters.fold(first, Self::or),
            None => Self::AnyOf(Vec::new()),
        }
    }

    /// Combine two filters; both must match.
    pub fn and(self, other: ReactionFilter) -> Self {
        match (self, other) {
            (Self::Any, f) | (f, Self::Any) => f,
            (Self::All(mut a), Self::All(b)) => {
                a.extend(b);
                Self::All(a)
            }
            (Self::All(mut a), f) => {
                a.push(f);
                Self::All(a)
            }
            (f, Self::All(mut b)) => {
                b.insert(0, f);
                Self::All(b)
            }
            (a, b) => Self::All(vec![a, b]),
        }
    }

    /// Control emoji pressed by the widget owner only.
    pub fn owner_control(emoji: &str, owner: &UserId) -> Self {
        Self::Emoji(emoji.to_string()).and(Self::User(owner.clone()))
    }

    /// Control emoji pressed by any human.
    pub fn human_control(emoji: &str) -> Self {
        Self::Emoji(emoji.to_string()).and(Self::Humans)
    }
}

/// Decides which channel messages a follow-up collector accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageFilter {
    Any,
    Author(UserId),
    Humans,
    /// Content starts with this prefix (after trimming leading whitespace)
    Prefix(String),
    All(Vec<MessageFilter>),
}

impl MessageFilter {
    pub fn matches(&self, message: &IncomingMessage) -> bool {
        match self {
            Self::Any => true,
            Self::Author(id) => message.author.id == *id,
            Self::Humans => !message.author.is_bot,
            Self::Prefix(prefix) => message.content.trim_start().starts_with(prefix.as_str()),
            Self::All(filters) => filters.iter().all(|f| f.matches(message)),
        }
    }

    pub fn and(self, other: MessageFilter) -> Self {
        match (self, other) {
            (Self::Any, f) | (f, Self::Any) => f,
            (Self::All(mut a), f) => {
                a.push(f);
                Self::All(a)
            }
            (a, b) => Self::All(vec![a, b]),
        }
    }
}
