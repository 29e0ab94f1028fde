//! Error types for the reactkit domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all reactkit operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Gateway errors ---
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Delivery failed on {gateway}: {reason}")]
    DeliveryFailed { gateway: String, reason: String },

    #[error("Gateway connection lost: {0}")]
    ConnectionLost(String),
}

impl GatewayError {
    /// Infrastructure failures that callers degrade to a no-op instead of reporting.
    pub fn is_channel_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ChannelUnavailable(_) | Self::MessageNotFound(_) | Self::ConnectionLost(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to attach {emoji}: {reason}")]
    Attachment { emoji: String, reason: String },

    #[error("Timed out after {timeout_secs}s waiting for {what}")]
    Timeout { what: String, timeout_secs: u64 },

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Session has no pages to display")]
    EmptyPages,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Failure reported by an external rating callback.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct ScoringError {
    pub reason: String,
}

impl ScoringError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
