//! Participant discovery for the USEF trust layer.
//!
//! Resolves a `(domain, role)` pair to the participant's endpoint, public
//! keys and protocol version. Trust is federated: each domain publishes its
//! own records, and nothing is cached here. Two strategies exist and exactly
//! one is chosen at startup:
//!
//! - [`DnsParticipantResolver`] reads TXT records under `_usef.<domain>.`
//!   through an injected [`DnsClient`].
//! - [`LocalParticipantResolver`] scans a YAML trust-store file, for test and
//!   simulation deployments.
//!
//! Both return the same [`Participant`] shape, so callers never branch on the
//! strategy.

mod dns;
mod hickory;
mod local;
mod trust_store;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use usef_types::{Participant, ResolvedParticipant, RoleKind};

pub use dns::{DnsClient, DnsLookupError, DnsParticipantResolver, TxtRecord};
pub use hickory::HickoryDnsClient;
pub use local::{LocalParticipantResolver, DEFAULT_TRUST_STORE_PATH};
pub use trust_store::{parse_trust_store, TrustStoreFile, TrustStoreParticipant, TrustStoreRole};

/// Errors produced by participant discovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// No participant publishes the requested role for the domain.
    #[error("participant not found: {domain} ({role})")]
    ParticipantNotFound { domain: String, role: RoleKind },

    /// The trust store is missing, unreadable or lists no participants.
    #[error("participant list is empty")]
    EmptyParticipantList,

    /// The domain publishes a protocol version this implementation does not speak.
    #[error("participant {domain} publishes unsupported version {version:?}")]
    VersionNotSupported { domain: String, version: String },

    /// The DNS infrastructure could not be reached. Distinct from a missing record.
    #[error("DNS unavailable: {0}")]
    DnsUnavailable(String),

    /// The trust-store file does not match the expected schema.
    #[error("trust store is malformed: {0}")]
    TrustStoreMalformed(String),
}

impl DiscoveryError {
    pub(crate) fn not_found(domain: &str, role: RoleKind) -> Self {
        Self::ParticipantNotFound {
            domain: domain.to_string(),
            role,
        }
    }
}

/// Resolves participants by domain and role.
///
/// Implementations perform their I/O synchronously on every call.
pub trait ParticipantResolver: Send + Sync {
    /// Returns the participant that publishes `role` for `domain`.
    fn find_participant(&self, domain: &str, role: RoleKind)
        -> Result<Participant, DiscoveryError>;

    /// Returns the normalized `(domain, role, url, keys, version)` view.
    fn resolve(&self, domain: &str, role: RoleKind) -> Result<ResolvedParticipant, DiscoveryError> {
        self.find_participant(domain, role)?
            .resolve(role)
            .ok_or_else(|| DiscoveryError::not_found(domain, role))
    }

    /// Returns the URL signed messages for `(domain, role)` are posted to.
    fn find_endpoint(&self, domain: &str, role: RoleKind) -> Result<String, DiscoveryError> {
        Ok(self.resolve(domain, role)?.url)
    }

    /// Returns the keys a message from `(domain, role)` may be signed with.
    fn find_public_keys(
        &self,
        domain: &str,
        role: RoleKind,
    ) -> Result<Vec<String>, DiscoveryError> {
        Ok(self.resolve(domain, role)?.public_keys)
    }
}

impl<R: ParticipantResolver + ?Sized> ParticipantResolver for Arc<R> {
    fn find_participant(
        &self,
        domain: &str,
        role: RoleKind,
    ) -> Result<Participant, DiscoveryError> {
        (**self).find_participant(domain, role)
    }
}

impl<R: ParticipantResolver + ?Sized> ParticipantResolver for Box<R> {
    fn find_participant(
        &self,
        domain: &str,
        role: RoleKind,
    ) -> Result<Participant, DiscoveryError> {
        (**self).find_participant(domain, role)
    }
}

/// Port queried on a configured nameserver.
pub const DNS_PORT: u16 = 53;

/// Settings that select and configure the discovery strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    /// Use the local trust store instead of DNS.
    pub bypass_dns: bool,
    /// Trust-store file consulted before [`DEFAULT_TRUST_STORE_PATH`].
    pub trust_store_path: Option<PathBuf>,
    /// Nameserver to query instead of the system resolver configuration.
    pub nameserver: Option<IpAddr>,
    /// Per-query DNS timeout.
    pub dns_timeout: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            bypass_dns: false,
            trust_store_path: None,
            nameserver: None,
            dns_timeout: Duration::from_secs(5),
        }
    }
}

/// Builds the resolver strategy the settings select.
///
/// # Errors
///
/// Returns [`DiscoveryError::DnsUnavailable`] if the DNS client cannot be
/// configured.
pub fn resolver_from_settings(
    settings: &DiscoverySettings,
) -> Result<Arc<dyn ParticipantResolver>, DiscoveryError> {
    if settings.bypass_dns {
        tracing::info!(
            configured = ?settings.trust_store_path,
            fallback = DEFAULT_TRUST_STORE_PATH,
            "participant discovery uses the local trust store"
        );
        return Ok(Arc::new(LocalParticipantResolver::new(
            settings.trust_store_path.clone(),
        )));
    }

    let client = match settings.nameserver {
        Some(ip) => {
            HickoryDnsClient::with_nameserver(SocketAddr::new(ip, DNS_PORT), settings.dns_timeout)
        }
        None => HickoryDnsClient::from_system_conf(settings.dns_timeout),
    }
    .map_err(|e| DiscoveryError::DnsUnavailable(e.to_string()))?;

    tracing::info!(nameserver = ?settings.nameserver, "participant discovery uses DNS");
    Ok(Arc::new(DnsParticipantResolver::new(client)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_selects_local_strategy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("participants.yaml");
        std::fs::write(
            &path,
            "participants:\n  - domain-name: brp.example.com\n    spec-version: \"2015\"\n    public-keys: cs1.KEY\n    brp-role:\n      - {}\n",
        )
        .expect("write trust store");

        let resolver = resolver_from_settings(&DiscoverySettings {
            bypass_dns: true,
            trust_store_path: Some(path),
            ..DiscoverySettings::default()
        })
        .expect("local resolver");

        let keys = resolver
            .find_public_keys("brp.example.com", RoleKind::Brp)
            .expect("keys");
        assert_eq!(keys, vec!["KEY".to_string()]);
        assert_eq!(
            resolver
                .find_endpoint("brp.example.com", RoleKind::Brp)
                .expect("endpoint"),
            "https://brp.example.com/USEF/2015/SignedMessage"
        );
    }

    #[test]
    fn explicit_nameserver_builds_dns_strategy() {
        let settings = DiscoverySettings {
            nameserver: Some("127.0.0.1".parse().expect("ip")),
            ..DiscoverySettings::default()
        };
        assert!(resolver_from_settings(&settings).is_ok());
    }
}
