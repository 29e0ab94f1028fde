//! # reactkit Core
//!
//! Domain types, traits, and error definitions for the reactkit
//! interactive-message engine. This crate has **zero transport dependencies**:
//! it defines the model that gateways and the session engine implement against.
//!
//! ## Design Philosophy
//!
//! The chat platform is reached only through the [`MessagingGateway`] trait.
//! Implementations live in `reactkit-channels`. This enables:
//! - Running the session engine against an in-memory loopback in tests
//! - Swapping the terminal demo gateway for a real platform adapter
//! - Clean dependency graph (all crates depend inward on core)

pub mod content;
pub mod error;
pub mod event;
pub mod filter;
pub mod gateway;

// Re-export key types at crate root for ergonomics
pub use content::{Content, Embed, EmbedField};
pub use error::{Error, GatewayError, ScoringError, SessionError};
pub use event::{CloseReason, EventBus, SessionEvent, SessionKind};
pub use filter::{MessageFilter, ReactionFilter};
pub use gateway::{
    ChannelId, IncomingMessage, MessageFeed, MessageHandle, MessageId, MessagingGateway,
    ReactionEvent, ReactionFeed, SubscriptionId, User, UserId,
};
