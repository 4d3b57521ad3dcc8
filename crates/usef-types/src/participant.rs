//! Trust data model produced by participant discovery.
//!
//! Participants are resolved fresh on every lookup and never persisted by
//! this layer.

use serde::{Deserialize, Serialize};

use crate::RoleKind;

/// A participant domain and the roles it publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique domain name of the participant.
    pub domain_name: String,
    /// Protocol version the participant speaks.
    pub spec_version: String,
    /// Participant-level public keys (Base64, key-type prefix stripped).
    pub public_keys: Vec<String>,
    /// Roles the participant takes on.
    pub roles: Vec<ParticipantRole>,
}

/// One role of a participant, with its endpoint and optional role keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRole {
    pub role: RoleKind,
    pub url: String,
    /// Role-specific public keys. When non-empty these replace the
    /// participant-level keys for this role.
    pub public_keys: Vec<String>,
}

impl Participant {
    /// Returns the entry for `role`, if the participant declares it.
    pub fn role(&self, role: RoleKind) -> Option<&ParticipantRole> {
        self.roles.iter().find(|r| r.role == role)
    }

    /// Flattens the participant to the normalized shape for a single role.
    ///
    /// Returns `None` if the participant does not declare `role`.
    pub fn resolve(&self, role: RoleKind) -> Option<ResolvedParticipant> {
        let entry = self.role(role)?;
        let public_keys = if entry.public_keys.is_empty() {
            self.public_keys.clone()
        } else {
            entry.public_keys.clone()
        };
        Some(ResolvedParticipant {
            domain: self.domain_name.clone(),
            role,
            url: entry.url.clone(),
            public_keys,
            spec_version: self.spec_version.clone(),
        })
    }
}

/// The strategy-independent result of resolving a `(domain, role)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedParticipant {
    pub domain: String,
    pub role: RoleKind,
    pub url: String,
    /// Effective public keys for this role.
    pub public_keys: Vec<String>,
    pub spec_version: String,
}
