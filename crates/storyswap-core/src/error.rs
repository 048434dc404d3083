//! Core domain errors.

use thiserror::Error;

/// Core domain errors for Storyswap.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid readiness phase transition.
    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidPhaseTransition { from: String, to: String },

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
