//! Error types for replay detection.

/// Errors produced by the replay detectors.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The message id was recorded before.
    #[error("message id already used: {0}")]
    MessageIdAlreadyUsed(String),

    /// The exact sealed bytes were received before (hash shown as hex).
    #[error("message already received and processed: {0}")]
    AlreadyReceivedAndProcessed(String),

    /// A database operation failed.
    #[error("replay store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection could be obtained.
    #[error("replay store connection unavailable: {0}")]
    Pool(String),
}

impl ReplayError {
    /// Returns `true` for the two duplicate-delivery outcomes.
    pub fn is_replay(&self) -> bool {
        matches!(
            self,
            Self::MessageIdAlreadyUsed(_) | Self::AlreadyReceivedAndProcessed(_)
        )
    }
}
