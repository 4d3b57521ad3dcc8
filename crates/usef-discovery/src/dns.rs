//! DNS discovery strategy.
//!
//! Record layout:
//!
//! ```text
//! _usef.<domain>.              TXT "2015"
//! _<role>._usef.<domain>.      TXT "cs1.<key> cs1.<key> ..."
//! ```

use hickory_resolver::proto::rr::Name;
use std::sync::Arc;
use thiserror::Error;
use usef_crypto::strip_key_prefix;
use usef_types::{endpoint_url, Participant, ParticipantRole, RoleKind, SUPPORTED_SPEC_VERSION};

use crate::{DiscoveryError, ParticipantResolver};

/// The character-strings of one TXT record, in order.
pub type TxtRecord = Vec<String>;

/// Outcome of a failed TXT lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsLookupError {
    /// The name does not exist or has no TXT records.
    #[error("no TXT records found")]
    NotFound,

    /// The query could not be answered: timeout, unreachable server, or a
    /// server failure response.
    #[error("DNS query failed: {0}")]
    Unavailable(String),
}

/// Synchronous TXT lookups. Constructed once at startup and injected.
pub trait DnsClient: Send + Sync {
    fn txt_lookup(&self, name: &str) -> Result<Vec<TxtRecord>, DnsLookupError>;
}

impl<C: DnsClient + ?Sized> DnsClient for Arc<C> {
    fn txt_lookup(&self, name: &str) -> Result<Vec<TxtRecord>, DnsLookupError> {
        (**self).txt_lookup(name)
    }
}

/// Resolves participants from the TXT records each domain publishes.
#[derive(Debug, Clone)]
pub struct DnsParticipantResolver<C> {
    client: C,
}

impl<C: DnsClient> DnsParticipantResolver<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Looks up `name` and requires exactly one TXT record.
    fn single_record(
        &self,
        name: &str,
        domain: &str,
        role: RoleKind,
    ) -> Result<TxtRecord, DiscoveryError> {
        let mut records = match self.client.txt_lookup(name) {
            Ok(records) => records,
            Err(DnsLookupError::NotFound) => {
                tracing::debug!(%name, "no TXT record published");
                return Err(DiscoveryError::not_found(domain, role));
            }
            Err(DnsLookupError::Unavailable(reason)) => {
                tracing::error!(%name, %reason, "DNS lookup failed");
                return Err(DiscoveryError::DnsUnavailable(reason));
            }
        };

        if records.len() != 1 {
            tracing::debug!(%name, count = records.len(), "expected exactly one TXT record");
            return Err(DiscoveryError::not_found(domain, role));
        }
        Ok(records.remove(0))
    }

    fn spec_version(&self, domain: &str, role: RoleKind) -> Result<String, DiscoveryError> {
        let record = self.single_record(&format!("_usef.{domain}."), domain, role)?;
        let [version] = record.as_slice() else {
            tracing::debug!(%domain, strings = record.len(), "version record must hold one string");
            return Err(DiscoveryError::not_found(domain, role));
        };
        if version != SUPPORTED_SPEC_VERSION {
            return Err(DiscoveryError::VersionNotSupported {
                domain: domain.to_string(),
                version: version.clone(),
            });
        }
        Ok(version.clone())
    }

    fn role_keys(&self, domain: &str, role: RoleKind) -> Result<Vec<String>, DiscoveryError> {
        let name = format!("_{}._usef.{domain}.", role.dns_label());
        // Long TXT values arrive split into 255-byte strings.
        let value = self.single_record(&name, domain, role)?.concat();
        let keys: Vec<String> = value
            .split_whitespace()
            .map(|key| strip_key_prefix(key).to_string())
            .collect();
        if keys.is_empty() {
            tracing::debug!(%name, "role record lists no keys");
            return Err(DiscoveryError::not_found(domain, role));
        }
        Ok(keys)
    }
}

impl<C: DnsClient> ParticipantResolver for DnsParticipantResolver<C> {
    fn find_participant(
        &self,
        domain: &str,
        role: RoleKind,
    ) -> Result<Participant, DiscoveryError> {
        let domain = domain.trim_end_matches('.');
        // The domain comes from the sender; a malformed one names no participant.
        if domain.is_empty() || Name::from_utf8(domain).is_err() {
            tracing::debug!(%domain, "sender domain is not a valid DNS name");
            return Err(DiscoveryError::not_found(domain, role));
        }
        let spec_version = self.spec_version(domain, role)?;
        let public_keys = self.role_keys(domain, role)?;

        tracing::debug!(%domain, %role, keys = public_keys.len(), "resolved participant via DNS");
        Ok(Participant {
            domain_name: domain.to_string(),
            roles: vec![ParticipantRole {
                role,
                url: endpoint_url(domain, &spec_version),
                public_keys,
            }],
            spec_version,
            public_keys: Vec::new(),
        })
    }
}
