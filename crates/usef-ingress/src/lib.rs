//! Inbound verification for signed USEF messages.
//!
//! Every delivery passes through [`IngressVerifier`], a linear pipeline that
//! stops at the first failure:
//!
//! 1. the sender claimed by the envelope must match the sender named in the
//!    signed metadata, and must resolve to a participant;
//! 2. the message id must not have been seen before;
//! 3. the message must not be past its `ValidUntil`;
//! 4. the sealed bytes must not have been seen before;
//! 5. the signature must verify against one of the sender's published keys.
//!
//! Steps 2 to 5 run in one replay-store transaction, so a rejected delivery
//! records nothing. Only a message that reaches
//! [`VerificationStage::SignatureValid`] is returned as a [`VerifiedMessage`].

mod metadata;
mod rejection;
mod verifier;

pub use metadata::{JsonMetadataReader, MetadataError, MetadataReader};
pub use rejection::RejectionReason;
pub use verifier::{IngressVerifier, VerificationStage, VerifiedMessage};
