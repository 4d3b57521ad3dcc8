//! The inbound verification pipeline.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use usef_discovery::ParticipantResolver;
use usef_replay::ReplayGuard;
use usef_types::{MessageMetadata, ResolvedParticipant, RoleKind, SignedEnvelope};

use crate::{JsonMetadataReader, MetadataReader, RejectionReason};

/// How far a delivery got through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStage {
    Received,
    SenderValidated,
    IdChecked,
    NotExpired,
    HashChecked,
    SignatureValid,
}

impl VerificationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::SenderValidated => "sender_validated",
            Self::IdChecked => "id_checked",
            Self::NotExpired => "not_expired",
            Self::HashChecked => "hash_checked",
            Self::SignatureValid => "signature_valid",
        }
    }
}

impl fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message whose sender, freshness and signature have all been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMessage {
    pub metadata: MessageMetadata,
    /// The signed payload, taken from the verified signature check.
    pub payload: Vec<u8>,
    pub sender: ResolvedParticipant,
}

/// Verifies inbound signed envelopes.
#[derive(Clone)]
pub struct IngressVerifier {
    resolver: Arc<dyn ParticipantResolver>,
    replay: ReplayGuard,
    metadata_reader: Arc<dyn MetadataReader>,
}

impl IngressVerifier {
    /// Creates a verifier reading JSON metadata.
    pub fn new(resolver: Arc<dyn ParticipantResolver>, replay: ReplayGuard) -> Self {
        Self {
            resolver,
            replay,
            metadata_reader: Arc::new(JsonMetadataReader),
        }
    }

    pub fn with_metadata_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.metadata_reader = reader;
        self
    }

    /// Verifies `envelope` against the current time.
    ///
    /// Blocks on resolver and database I/O; async callers should run it on
    /// the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns the first [`RejectionReason`] the pipeline hits.
    pub fn verify_incoming(
        &self,
        envelope: &SignedEnvelope,
    ) -> Result<VerifiedMessage, RejectionReason> {
        self.verify_incoming_at(envelope, Utc::now())
    }

    /// Verifies `envelope` as if it arrived at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RejectionReason`] the pipeline hits.
    pub fn verify_incoming_at(
        &self,
        envelope: &SignedEnvelope,
        now: DateTime<Utc>,
    ) -> Result<VerifiedMessage, RejectionReason> {
        let mut stage = VerificationStage::Received;
        let result = self.run(envelope, now, &mut stage);

        match &result {
            Ok(message) => tracing::debug!(
                domain = %message.sender.domain,
                role = %message.sender.role,
                message_id = %message.metadata.message_id,
                "inbound message verified"
            ),
            Err(reason) if reason.is_infrastructure() => tracing::error!(
                domain = %envelope.sender_domain,
                role = %envelope.sender_role,
                stage = %stage,
                reason = reason.code(),
                error = %reason,
                "inbound message could not be verified"
            ),
            Err(reason) => tracing::info!(
                domain = %envelope.sender_domain,
                role = %envelope.sender_role,
                stage = %stage,
                reason = reason.code(),
                error = %reason,
                "inbound message rejected"
            ),
        }
        result
    }

    fn run(
        &self,
        envelope: &SignedEnvelope,
        now: DateTime<Utc>,
        stage: &mut VerificationStage,
    ) -> Result<VerifiedMessage, RejectionReason> {
        if envelope.sender_domain.trim().is_empty() {
            return Err(RejectionReason::MissingSenderDomain);
        }
        if envelope.sender_role.trim().is_empty() {
            return Err(RejectionReason::MissingSenderRole);
        }

        let sealed = usef_crypto::decode_sealed(&envelope.body)?;
        let metadata = self
            .metadata_reader
            .read_metadata(usef_crypto::open_unverified(&sealed)?)?;

        let sender = self.validate_sender(envelope, &metadata)?;
        *stage = VerificationStage::SenderValidated;

        let payload = self
            .replay
            .within_transaction(now, |scope| -> Result<_, RejectionReason> {
                scope.record_message_id(&metadata.message_id)?;
                *stage = VerificationStage::IdChecked;

                match metadata.valid_until {
                    Some(valid_until) if metadata.is_expired_at(now) => {
                        return Err(RejectionReason::MessageExpired { valid_until });
                    }
                    _ => {}
                }
                *stage = VerificationStage::NotExpired;

                scope.record_content_hash(&sealed)?;
                *stage = VerificationStage::HashChecked;

                let payload = verify_signature(&envelope.body, &sender.public_keys)?;
                *stage = VerificationStage::SignatureValid;
                Ok(payload)
            })?;

        Ok(VerifiedMessage {
            metadata,
            payload,
            sender,
        })
    }

    fn validate_sender(
        &self,
        envelope: &SignedEnvelope,
        metadata: &MessageMetadata,
    ) -> Result<ResolvedParticipant, RejectionReason> {
        if envelope.sender_domain != metadata.sender_domain
            || envelope.sender_role != metadata.sender_role
        {
            return Err(RejectionReason::InvalidSender(format!(
                "envelope claims {} ({}), metadata names {} ({})",
                envelope.sender_domain,
                envelope.sender_role,
                metadata.sender_domain,
                metadata.sender_role
            )));
        }

        let role: RoleKind = envelope
            .sender_role
            .parse::<RoleKind>()
            .map_err(|e| RejectionReason::InvalidSender(e.to_string()))?;
        Ok(self.resolver.resolve(&envelope.sender_domain, role)?)
    }
}

/// Tries every published key; the first that verifies wins.
fn verify_signature(
    sealed_b64: &str,
    public_keys: &[String],
) -> Result<Vec<u8>, RejectionReason> {
    for key in public_keys {
        match usef_crypto::verify(sealed_b64, key) {
            Ok(payload) => return Ok(payload),
            Err(e) => tracing::debug!(error = %e, "signature did not verify against key"),
        }
    }
    Err(RejectionReason::SignatureVerificationFailed)
}
