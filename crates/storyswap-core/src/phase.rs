//! Conversation readiness phases.
//!
//! The chat screen goes through four gates in sequence before the composer
//! is enabled. Failures do not transition anywhere: a stalled gate is the
//! only failure surface, indistinguishable from a slow network.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Readiness state of a conversation view.
///
/// Transitions are forward-only:
/// `AwaitingSession -> AwaitingConversation -> AwaitingHistory -> Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    /// Resolving the local identity from the stored credential.
    AwaitingSession,
    /// Waiting for the backend to assign a conversation id.
    AwaitingConversation,
    /// Initial history fetch in flight.
    AwaitingHistory,
    /// Composer enabled; live channel joined and poll loop running.
    Ready,
}

impl ConversationPhase {
    /// Move to the next gate.
    pub fn advance(self) -> Result<Self, CoreError> {
        match self {
            Self::AwaitingSession => Ok(Self::AwaitingConversation),
            Self::AwaitingConversation => Ok(Self::AwaitingHistory),
            Self::AwaitingHistory => Ok(Self::Ready),
            Self::Ready => Err(CoreError::InvalidPhaseTransition {
                from: self.to_string(),
                to: "past ready".to_string(),
            }),
        }
    }

    /// Whether the composer is enabled.
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

impl Default for ConversationPhase {
    fn default() -> Self {
        Self::AwaitingSession
    }
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AwaitingSession => "awaiting_session",
            Self::AwaitingConversation => "awaiting_conversation",
            Self::AwaitingHistory => "awaiting_history",
            Self::Ready => "ready",
        };
        write!(f, "{}", s)
    }
}
