//! Why an inbound message was not accepted.

use chrono::{DateTime, Utc};
use thiserror::Error;
use usef_crypto::CryptoError;
use usef_discovery::DiscoveryError;
use usef_replay::ReplayError;
use usef_types::RoleKind;

use crate::MetadataError;

/// Terminal outcome of a rejected delivery.
///
/// Every variant is final; the verifier never retries. The caller turns it
/// into a negative acknowledgement or a transport error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("sender domain missing")]
    MissingSenderDomain,

    #[error("sender role missing")]
    MissingSenderRole,

    /// The envelope's sender does not match the signed metadata, or names no
    /// known role.
    #[error("invalid sender: {0}")]
    InvalidSender(String),

    #[error("participant not found: {domain} ({role})")]
    ParticipantNotFound { domain: String, role: RoleKind },

    #[error("participant list is empty")]
    EmptyParticipantList,

    #[error("participant {domain} publishes unsupported version {version:?}")]
    VersionNotSupported { domain: String, version: String },

    #[error("DNS unavailable: {0}")]
    DnsUnavailable(String),

    #[error("trust store is malformed: {0}")]
    TrustStoreMalformed(String),

    #[error("message id already used: {0}")]
    MessageIdAlreadyUsed(String),

    #[error("message already received and processed: {0}")]
    AlreadyReceivedAndProcessed(String),

    #[error("message expired at {valid_until}")]
    MessageExpired { valid_until: DateTime<Utc> },

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("sealing failed: {0}")]
    SealingFailed(String),

    #[error("malformed message metadata: {0}")]
    MalformedMetadata(String),

    #[error("replay store unavailable: {0}")]
    ReplayStoreUnavailable(String),
}

impl RejectionReason {
    /// Stable name of the variant, used in logs and negative acknowledgements.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSenderDomain => "MissingSenderDomain",
            Self::MissingSenderRole => "MissingSenderRole",
            Self::InvalidSender(_) => "InvalidSender",
            Self::ParticipantNotFound { .. } => "ParticipantNotFound",
            Self::EmptyParticipantList => "EmptyParticipantList",
            Self::VersionNotSupported { .. } => "VersionNotSupported",
            Self::DnsUnavailable(_) => "DnsUnavailable",
            Self::TrustStoreMalformed(_) => "TrustStoreMalformed",
            Self::MessageIdAlreadyUsed(_) => "MessageIdAlreadyUsed",
            Self::AlreadyReceivedAndProcessed(_) => "AlreadyReceivedAndProcessed",
            Self::MessageExpired { .. } => "MessageExpired",
            Self::InvalidEncoding(_) => "InvalidEncoding",
            Self::InvalidKeyLength { .. } => "InvalidKeyLength",
            Self::SignatureVerificationFailed => "SignatureVerificationFailed",
            Self::SealingFailed(_) => "SealingFailed",
            Self::MalformedMetadata(_) => "MalformedMetadata",
            Self::ReplayStoreUnavailable(_) => "ReplayStoreUnavailable",
        }
    }

    /// Returns `true` when the failure lies in this node's own infrastructure
    /// rather than in the message.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::DnsUnavailable(_) | Self::TrustStoreMalformed(_) | Self::ReplayStoreUnavailable(_)
        )
    }

    /// Returns `true` for duplicate deliveries.
    pub fn is_replay(&self) -> bool {
        matches!(
            self,
            Self::MessageIdAlreadyUsed(_) | Self::AlreadyReceivedAndProcessed(_)
        )
    }
}

impl From<DiscoveryError> for RejectionReason {
    fn from(e: DiscoveryError) -> Self {
        match e {
            DiscoveryError::ParticipantNotFound { domain, role } => {
                Self::ParticipantNotFound { domain, role }
            }
            DiscoveryError::EmptyParticipantList => Self::EmptyParticipantList,
            DiscoveryError::VersionNotSupported { domain, version } => {
                Self::VersionNotSupported { domain, version }
            }
            DiscoveryError::DnsUnavailable(msg) => Self::DnsUnavailable(msg),
            DiscoveryError::TrustStoreMalformed(msg) => Self::TrustStoreMalformed(msg),
        }
    }
}

impl From<CryptoError> for RejectionReason {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidEncoding(msg) => Self::InvalidEncoding(msg),
            CryptoError::InvalidKeyLength { expected, actual } => {
                Self::InvalidKeyLength { expected, actual }
            }
            CryptoError::SignatureVerificationFailed => Self::SignatureVerificationFailed,
            CryptoError::SealingFailed(msg) => Self::SealingFailed(msg),
        }
    }
}

impl From<ReplayError> for RejectionReason {
    fn from(e: ReplayError) -> Self {
        match e {
            ReplayError::MessageIdAlreadyUsed(id) => Self::MessageIdAlreadyUsed(id),
            ReplayError::AlreadyReceivedAndProcessed(hash) => {
                Self::AlreadyReceivedAndProcessed(hash)
            }
            ReplayError::Database(e) => Self::ReplayStoreUnavailable(e.to_string()),
            ReplayError::Pool(msg) => Self::ReplayStoreUnavailable(msg),
        }
    }
}

impl From<MetadataError> for RejectionReason {
    fn from(e: MetadataError) -> Self {
        Self::MalformedMetadata(e.0)
    }
}
