//! # Playback Error Types
//!
//! Errors surfaced by queue intents and engine commands.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// `skip_to` received an index outside `[0, len)`. No state was mutated.
    #[error("Invalid queue index {index} (queue length {len})")]
    InvalidIndex { index: usize, len: usize },

    /// A playback command was issued before `ensure_ready()` succeeded.
    #[error("Playback engine not ready")]
    EngineNotReady,

    /// Native engine initialization failed. Every caller awaiting the same
    /// initialization observes this error.
    #[error("Playback engine initialization failed: {0}")]
    EngineInitFailed(String),

    /// The host engine rejected a command.
    #[error("Playback engine error: {0}")]
    Engine(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if the operation can succeed after calling
    /// `ensure_ready()` again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlaybackError::EngineNotReady | PlaybackError::EngineInitFailed(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(PlaybackError::EngineNotReady.is_retryable());
        assert!(PlaybackError::EngineInitFailed("boom".into()).is_retryable());
        assert!(!PlaybackError::InvalidIndex { index: 3, len: 2 }.is_retryable());
        assert!(!PlaybackError::Engine(BridgeError::OperationFailed("x".into())).is_retryable());
    }

    #[test]
    fn test_invalid_index_message() {
        let err = PlaybackError::InvalidIndex { index: 5, len: 2 };
        assert_eq!(err.to_string(), "Invalid queue index 5 (queue length 2)");
    }
}
