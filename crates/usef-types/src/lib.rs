//! Shared types, protocol constants and the sequence generator for the USEF
//! secure-ingress layer.
//!
//! This crate provides the foundational types used across all workspace
//! crates: the participant role tags, the trust data model produced by
//! participant discovery, and the wire shapes of a signed envelope and the
//! metadata carried inside its payload.
//!
//! No crate in the workspace depends on anything *except* `usef-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod message;
mod participant;
mod sequence;

pub use message::{MessageMetadata, SignedEnvelope};
pub use participant::{Participant, ParticipantRole, ResolvedParticipant};
pub use sequence::SequenceGenerator;

/// The single protocol version this implementation speaks.
pub const SUPPORTED_SPEC_VERSION: &str = "2015";

/// Key-type tag that may prefix a published public key.
pub const KEY_TYPE_PREFIX: &str = "cs1.";

/// Builds the endpoint URL a participant receives signed messages on.
///
/// `https://<domain>/USEF/<version>/SignedMessage`
pub fn endpoint_url(domain: &str, spec_version: &str) -> String {
    format!("https://{domain}/USEF/{spec_version}/SignedMessage")
}

/// Protocol roles a participant domain can take on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleKind {
    /// Aggregator.
    Agr,
    /// Balance Responsible Party.
    Brp,
    /// Distribution System Operator.
    Dso,
    /// Central Registration Operator.
    Cro,
    /// Meter Data Company.
    Mdc,
}

impl RoleKind {
    /// All roles, in wire-tag order.
    pub const ALL: [RoleKind; 5] = [
        RoleKind::Agr,
        RoleKind::Brp,
        RoleKind::Dso,
        RoleKind::Cro,
        RoleKind::Mdc,
    ];

    /// Returns the upper-case wire tag (`"AGR"`, `"BRP"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agr => "AGR",
            Self::Brp => "BRP",
            Self::Dso => "DSO",
            Self::Cro => "CRO",
            Self::Mdc => "MDC",
        }
    }

    /// Returns the lower-case label used in DNS record names.
    pub fn dns_label(self) -> &'static str {
        match self {
            Self::Agr => "agr",
            Self::Brp => "brp",
            Self::Dso => "dso",
            Self::Cro => "cro",
            Self::Mdc => "mdc",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role tag is not one of the five protocol roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown participant role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for RoleKind {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AGR" => Ok(Self::Agr),
            "BRP" => Ok(Self::Brp),
            "DSO" => Ok(Self::Dso),
            "CRO" => Ok(Self::Cro),
            "MDC" => Ok(Self::Mdc),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
