//! [`DnsClient`] backed by the hickory stub resolver.

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::Name;
use hickory_resolver::Resolver;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::dns::{DnsClient, DnsLookupError, TxtRecord};

/// Blocking DNS client. One query attempt, no answer cache.
///
/// The underlying resolver owns a private async runtime, so the client must
/// be dropped outside of any async context.
pub struct HickoryDnsClient {
    resolver: Resolver,
}

impl HickoryDnsClient {
    /// Uses the nameservers from the host's resolver configuration.
    pub fn from_system_conf(timeout: Duration) -> Result<Self, DnsLookupError> {
        let (config, opts) = hickory_resolver::system_conf::read_system_conf()
            .map_err(|e| DnsLookupError::Unavailable(e.to_string()))?;
        Self::build(config, opts, timeout)
    }

    /// Sends every query to `nameserver` over UDP, falling back to TCP.
    pub fn with_nameserver(
        nameserver: SocketAddr,
        timeout: Duration,
    ) -> Result<Self, DnsLookupError> {
        let config = ResolverConfig::from_parts(
            None,
            Vec::new(),
            NameServerConfigGroup::from_ips_clear(&[nameserver.ip()], nameserver.port(), true),
        );
        Self::build(config, ResolverOpts::default(), timeout)
    }

    fn build(
        config: ResolverConfig,
        mut opts: ResolverOpts,
        timeout: Duration,
    ) -> Result<Self, DnsLookupError> {
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        let resolver =
            Resolver::new(config, opts).map_err(|e| DnsLookupError::Unavailable(e.to_string()))?;
        Ok(Self { resolver })
    }
}

impl fmt::Debug for HickoryDnsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HickoryDnsClient").finish_non_exhaustive()
    }
}

/// NXDOMAIN and an empty NOERROR answer say the record does not exist.
/// Every other code (SERVFAIL, REFUSED, ...) means the question went
/// unanswered.
fn is_negative_answer(code: ResponseCode) -> bool {
    matches!(code, ResponseCode::NXDomain | ResponseCode::NoError)
}

impl DnsClient for HickoryDnsClient {
    fn txt_lookup(&self, name: &str) -> Result<Vec<TxtRecord>, DnsLookupError> {
        // A name that does not parse cannot exist; nothing is sent.
        let name = Name::from_utf8(name).map_err(|e| {
            tracing::debug!(%name, error = %e, "not a valid DNS name");
            DnsLookupError::NotFound
        })?;

        let lookup = self.resolver.txt_lookup(name).map_err(|e| match e.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. }
                if is_negative_answer(*response_code) =>
            {
                DnsLookupError::NotFound
            }
            _ => DnsLookupError::Unavailable(e.to_string()),
        })?;

        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                    .collect()
            })
            .collect())
    }
}
