//! Hand-off of verified messages to the workflow layer.

use thiserror::Error;
use usef_ingress::VerifiedMessage;

#[derive(Debug, Error)]
#[error("dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Consumes messages that passed verification.
///
/// Called on the blocking pool after the replay records are committed; a
/// failure here does not make the message deliverable again.
pub trait MessageDispatcher: Send + Sync {
    fn dispatch(&self, message: &VerifiedMessage) -> Result<(), DispatchError>;
}

/// Logs each accepted message and does nothing else.
#[derive(Debug, Default)]
pub struct LoggingDispatcher;

impl MessageDispatcher for LoggingDispatcher {
    fn dispatch(&self, message: &VerifiedMessage) -> Result<(), DispatchError> {
        tracing::info!(
            domain = %message.sender.domain,
            role = %message.sender.role,
            message_id = %message.metadata.message_id,
            conversation_id = %message.metadata.conversation_id,
            bytes = message.payload.len(),
            "accepted inbound message"
        );
        Ok(())
    }
}
